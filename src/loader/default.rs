use crate::cache::ManifestCache;
use crate::error::{NearconfError, Result};
use crate::loader::module::{ModuleRunner, is_module_path};
use crate::options::TextParser;
use crate::resolve::is_manifest;
use serde_json::Value;
use std::path::Path;
use tracing::trace;

/// How the default loader treats a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
	/// Code module, evaluated by the module runner.
	Module,
	/// `package.json`.
	Manifest,
	/// Any other `.json` file.
	Json,
	/// Everything else, returned as raw text.
	Text,
}

impl FileKind {
	pub fn of(path: &Path) -> Self {
		if is_module_path(path) {
			FileKind::Module
		} else if is_manifest(path) {
			FileKind::Manifest
		} else if path.extension().is_some_and(|ext| ext == "json") {
			FileKind::Json
		} else {
			FileKind::Text
		}
	}
}

/// Fallback loader for paths no registered loader matches.
pub struct DefaultLoader<'a> {
	pub parse_text: &'a TextParser,
	pub manifests: &'a ManifestCache,
	pub runner: &'a ModuleRunner,
}

impl DefaultLoader<'_> {
	pub fn load(&self, path: &Path) -> Result<Value> {
		match FileKind::of(path) {
			FileKind::Module => self.runner.run(path),
			kind => {
				if let Some(value) = self.cached_manifest(kind, path) {
					return Ok(value);
				}
				let text = std::fs::read_to_string(path).map_err(|source| read_error(path, source))?;
				self.decode(kind, path, text)
			}
		}
	}

	pub async fn load_async(&self, path: &Path) -> Result<Value> {
		match FileKind::of(path) {
			FileKind::Module => self.runner.run_async(path).await,
			kind => {
				if let Some(value) = self.cached_manifest(kind, path) {
					return Ok(value);
				}
				let text = tokio::fs::read_to_string(path)
					.await
					.map_err(|source| read_error(path, source))?;
				self.decode(kind, path, text)
			}
		}
	}

	/// The whole manifest parsed during resolution, if its package key matched.
	fn cached_manifest(&self, kind: FileKind, path: &Path) -> Option<Value> {
		if kind != FileKind::Manifest {
			return None;
		}
		let manifest = self.manifests.get(path)?;
		trace!(path = %path.display(), "manifest cache hit");
		Some(manifest.clone())
	}

	fn decode(&self, kind: FileKind, path: &Path, text: String) -> Result<Value> {
		match kind {
			FileKind::Manifest | FileKind::Json => {
				self.parse_text
					.parse(&text)
					.map_err(|source| NearconfError::ParseError {
						path: path.to_path_buf(),
						source,
					})
			}
			_ => Ok(Value::String(text)),
		}
	}
}

fn read_error(path: &Path, source: std::io::Error) -> NearconfError {
	NearconfError::ReadError {
		path: path.to_path_buf(),
		source,
	}
}
