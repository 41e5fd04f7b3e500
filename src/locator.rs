//! The load pipeline: resolve a path, pick a loader, cache the data.

use crate::cache::{ExistsCache, LoadCache, ManifestCache};
use crate::error::Result;
use crate::loader::{DefaultLoader, Loader, LoaderId, LoaderRegistry};
use crate::options::{Options, Query, ResolvedOptions, resolve_options};
use crate::resolve::Walker;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of a load: the resolved path with its data, or empty.
///
/// Serializes to `{"path": .., "data": ..}` or `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadResult {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl LoadResult {
	pub fn found(path: PathBuf, data: Value) -> Self {
		LoadResult {
			path: Some(path),
			data: Some(data),
		}
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.path.is_none()
	}
}

/// Finds and loads the nearest configuration file.
///
/// Each instance owns its caches and loader registry. Repeated calls reuse
/// existence checks, keyed manifests and loaded data until [`clear_cache`]
/// is called.
///
/// [`clear_cache`]: ConfigLocator::clear_cache
#[derive(Debug, Default)]
pub struct ConfigLocator {
	options: Options,
	exists: ExistsCache,
	manifests: ManifestCache,
	loaded: LoadCache,
	loaders: LoaderRegistry,
}

impl ConfigLocator {
	pub fn new(options: Options) -> Self {
		ConfigLocator {
			options,
			..Default::default()
		}
	}

	pub fn options(&self) -> &Options {
		&self.options
	}

	/// Path of the nearest matching candidate, or `None`.
	pub fn resolve(&mut self, query: impl Into<Query>) -> Result<Option<PathBuf>> {
		let resolved = resolve_options(&self.options, query.into())?;
		self.walker(&resolved).resolve()
	}

	/// Async form of [`resolve`](ConfigLocator::resolve).
	pub async fn resolve_async(&mut self, query: impl Into<Query>) -> Result<Option<PathBuf>> {
		let resolved = resolve_options(&self.options, query.into())?;
		self.walker(&resolved).resolve_async().await
	}

	/// Resolve, then load the file with the first matching loader.
	///
	/// A path that was loaded before is served from the load cache without
	/// running any loader again.
	pub fn load(&mut self, query: impl Into<Query>) -> Result<LoadResult> {
		let resolved = resolve_options(&self.options, query.into())?;
		let Some(path) = self.walker(&resolved).resolve()? else {
			return Ok(LoadResult::empty());
		};
		if let Some(cached) = self.cached_load(&path) {
			return Ok(cached);
		}

		let outcome = match self.loaders.find_match(&path) {
			Some(loader) => {
				debug!(loader = loader.name(), path = %path.display(), "running loader");
				loader.load_sync(&path)
			}
			None => self.default_loader().load(&path),
		};

		self.finish_load(path, outcome)
	}

	/// Async form of [`load`](ConfigLocator::load).
	pub async fn load_async(&mut self, query: impl Into<Query>) -> Result<LoadResult> {
		let resolved = resolve_options(&self.options, query.into())?;
		let Some(path) = self.walker(&resolved).resolve_async().await? else {
			return Ok(LoadResult::empty());
		};
		if let Some(cached) = self.cached_load(&path) {
			return Ok(cached);
		}

		let outcome = match self.loaders.find_match(&path) {
			Some(loader) => {
				debug!(loader = loader.name(), path = %path.display(), "running loader");
				loader.load_async(&path).await
			}
			None => self.default_loader().load_async(&path).await,
		};

		self.finish_load(path, outcome)
	}

	/// Register a loader after all existing ones.
	pub fn register_loader(&mut self, loader: Loader) -> &mut Self {
		self.loaders.register(loader);
		self
	}

	/// Remove every loader registered under `name`.
	pub fn unregister_loader(&mut self, name: &str) -> &mut Self {
		self.loaders.remove_named(name);
		self
	}

	/// Register a loader and return a handle for [`remove_loader`](ConfigLocator::remove_loader).
	pub fn add_loader(&mut self, loader: Loader) -> LoaderId {
		self.loaders.register(loader)
	}

	pub fn remove_loader(&mut self, id: LoaderId) -> &mut Self {
		self.loaders.remove(id);
		self
	}

	pub fn loaders(&self) -> &LoaderRegistry {
		&self.loaders
	}

	/// Empty the existence, manifest and load caches.
	pub fn clear_cache(&mut self) -> &mut Self {
		self.exists.clear();
		self.manifests.clear();
		self.loaded.clear();
		self
	}

	fn walker<'a>(&'a mut self, resolved: &'a ResolvedOptions) -> Walker<'a> {
		Walker::new(
			resolved,
			&self.options.parse_text,
			&mut self.exists,
			&mut self.manifests,
		)
	}

	fn default_loader(&self) -> DefaultLoader<'_> {
		DefaultLoader {
			parse_text: &self.options.parse_text,
			manifests: &self.manifests,
			runner: &self.options.module_runner,
		}
	}

	fn cached_load(&self, path: &Path) -> Option<LoadResult> {
		let data = self.loaded.get(path)?;
		debug!(path = %path.display(), "load cache hit");
		Some(LoadResult::found(path.to_path_buf(), data.clone()))
	}

	/// Cache successful loads. A file that vanished after it was resolved is
	/// forgotten and reported as not found.
	fn finish_load(&mut self, path: PathBuf, outcome: Result<Value>) -> Result<LoadResult> {
		match outcome {
			Ok(data) => {
				self.loaded.insert(path.clone(), data.clone());
				Ok(LoadResult::found(path, data))
			}
			Err(err) if err.is_vanished_file() => {
				debug!(path = %path.display(), "resolved file vanished before load");
				self.exists.invalidate(&path);
				self.manifests.invalidate(&path);
				self.loaded.invalidate(&path);
				Ok(LoadResult::empty())
			}
			Err(err) => Err(err),
		}
	}
}
