use crate::cache::{ExistsCache, ManifestCache};
use crate::error::{NearconfError, Result};
use crate::options::{ResolvedOptions, TextParser, normalize_path};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// File name that gets the package key treatment.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Directory name the walk never searches or climbs past.
pub const SANDBOX_DIR_NAME: &str = "node_modules";

/// Whether `path` names a `package.json` file.
pub fn is_manifest(path: &Path) -> bool {
	path.file_name()
		.is_some_and(|name| name == MANIFEST_FILE_NAME)
}

/// Directories to search, nearest first.
///
/// Starts at `cwd` and climbs one parent at a time. Stops before the stop
/// directory, before any `node_modules` directory, and after the root.
pub fn search_dirs(options: &ResolvedOptions) -> impl Iterator<Item = &Path> {
	let stop_dir = options.stop_dir.as_path();
	options.cwd.ancestors().take_while(move |dir| {
		*dir != stop_dir && dir.file_name().is_none_or(|name| name != SANDBOX_DIR_NAME)
	})
}

/// One resolution run over a set of resolved options.
///
/// Borrows the caches of the owning locator. Candidates inside a directory
/// are checked in declared order, and a directory is exhausted before the
/// walk moves to its parent.
pub struct Walker<'a> {
	options: &'a ResolvedOptions,
	parse_text: &'a TextParser,
	exists: &'a mut ExistsCache,
	manifests: &'a mut ManifestCache,
}

impl<'a> Walker<'a> {
	pub fn new(
		options: &'a ResolvedOptions,
		parse_text: &'a TextParser,
		exists: &'a mut ExistsCache,
		manifests: &'a mut ManifestCache,
	) -> Self {
		Walker {
			options,
			parse_text,
			exists,
			manifests,
		}
	}

	/// Find the first matching candidate with blocking filesystem calls.
	pub fn resolve(mut self) -> Result<Option<PathBuf>> {
		let options = self.options;

		for dir in search_dirs(options) {
			for name in &options.files {
				let file = normalize_path(&dir.join(name));

				let exists = match self.cached_exists(&file) {
					Some(exists) => exists,
					None => std::fs::metadata(&file).is_ok(),
				};
				self.exists.insert(file.clone(), exists);

				if !exists {
					continue;
				}
				if !self.needs_key_check(&file) {
					debug!(path = %file.display(), "resolved candidate");
					return Ok(Some(file));
				}
				if self.accept_manifest(&file, std::fs::read_to_string(&file))? {
					debug!(path = %file.display(), "resolved manifest with package key");
					return Ok(Some(file));
				}
			}
		}

		debug!(cwd = %options.cwd.display(), "no candidate found");
		Ok(None)
	}

	/// Find the first matching candidate, yielding at each existence check and read.
	pub async fn resolve_async(mut self) -> Result<Option<PathBuf>> {
		let options = self.options;

		for dir in search_dirs(options) {
			for name in &options.files {
				let file = normalize_path(&dir.join(name));

				let exists = match self.cached_exists(&file) {
					Some(exists) => exists,
					None => tokio::fs::metadata(&file).await.is_ok(),
				};
				self.exists.insert(file.clone(), exists);

				if !exists {
					continue;
				}
				if !self.needs_key_check(&file) {
					debug!(path = %file.display(), "resolved candidate");
					return Ok(Some(file));
				}
				let text = tokio::fs::read_to_string(&file).await;
				if self.accept_manifest(&file, text)? {
					debug!(path = %file.display(), "resolved manifest with package key");
					return Ok(Some(file));
				}
			}
		}

		debug!(cwd = %options.cwd.display(), "no candidate found");
		Ok(None)
	}

	fn cached_exists(&self, file: &Path) -> Option<bool> {
		if self.options.bypass_cache {
			return None;
		}
		let cached = self.exists.get(file).copied();
		if let Some(exists) = cached {
			trace!(path = %file.display(), exists, "existence cache hit");
		}
		cached
	}

	fn needs_key_check(&self, file: &Path) -> bool {
		self.options.package_key.is_some() && is_manifest(file)
	}

	/// Decide whether an existing `package.json` counts as a match.
	///
	/// It matches only when the package key is an own property. A manifest
	/// that disappeared since its existence check is forgotten and skipped.
	fn accept_manifest(&mut self, file: &Path, text: std::io::Result<String>) -> Result<bool> {
		let Some(key) = self.options.package_key.as_deref() else {
			return Ok(false);
		};

		let text = match text {
			Ok(text) => text,
			Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %file.display(), "manifest vanished after existence check");
				self.exists.invalidate(file);
				return Ok(false);
			}
			Err(source) => {
				return Err(NearconfError::ReadError {
					path: file.to_path_buf(),
					source,
				});
			}
		};

		let data = self
			.parse_text
			.parse(&text)
			.map_err(|source| NearconfError::ParseError {
				path: file.to_path_buf(),
				source,
			})?;

		if has_own_key(&data, key) {
			self.manifests.insert(file, data);
			Ok(true)
		} else {
			trace!(path = %file.display(), key, "manifest lacks package key");
			Ok(false)
		}
	}
}

fn has_own_key(data: &Value, key: &str) -> bool {
	data.as_object().is_some_and(|object| object.contains_key(key))
}
