//! Pluggable loaders that turn a resolved path into data.
//!
//! This module handles:
//! - Loader definitions with their path matchers and execution modes
//! - The ordered loader registry
//! - The default loader used when no registered loader matches
//! - Evaluating code modules through an external runner

pub mod default;
pub mod module;
pub mod registry;
pub mod toml_file;

pub use default::{DefaultLoader, FileKind};
pub use module::ModuleRunner;
pub use registry::{LoaderId, LoaderRegistry};
pub use toml_file::toml_loader;

use crate::error::{BoxError, NearconfError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

/// Outcome of a loader function.
pub type LoadOutcome = std::result::Result<Value, BoxError>;

/// Boxed future returned by asynchronous loaders.
pub type LoadFuture = Pin<Box<dyn Future<Output = LoadOutcome> + Send>>;

pub type SyncLoadFn = Arc<dyn Fn(&Path) -> LoadOutcome + Send + Sync>;
pub type AsyncLoadFn = Arc<dyn Fn(PathBuf) -> LoadFuture + Send + Sync>;

/// Execution capabilities of a loader.
#[derive(Clone)]
pub enum LoadMode {
	Sync(SyncLoadFn),
	Async(AsyncLoadFn),
	Both {
		sync: SyncLoadFn,
		future: AsyncLoadFn,
	},
}

impl LoadMode {
	pub fn sync_fn(&self) -> Option<&SyncLoadFn> {
		match self {
			LoadMode::Sync(f) | LoadMode::Both { sync: f, .. } => Some(f),
			LoadMode::Async(_) => None,
		}
	}

	pub fn async_fn(&self) -> Option<&AsyncLoadFn> {
		match self {
			LoadMode::Async(f) | LoadMode::Both { future: f, .. } => Some(f),
			LoadMode::Sync(_) => None,
		}
	}
}

impl fmt::Debug for LoadMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			LoadMode::Sync(_) => "Sync",
			LoadMode::Async(_) => "Async",
			LoadMode::Both { .. } => "Both",
		})
	}
}

/// Predicate deciding which paths a loader handles.
#[derive(Clone)]
pub enum Matcher {
	/// Regex tested against the whole path string.
	Regex(Regex),
	/// File extension, compared without the leading dot.
	Extension(String),
	Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl Matcher {
	/// Compile a regex matcher.
	pub fn regex(pattern: &str) -> Result<Self> {
		Regex::new(pattern)
			.map(Matcher::Regex)
			.map_err(|source| NearconfError::InvalidRegex {
				pattern: pattern.to_string(),
				source,
			})
	}

	pub fn extension(ext: impl Into<String>) -> Self {
		Matcher::Extension(ext.into())
	}

	pub fn predicate<F>(f: F) -> Self
	where
		F: Fn(&Path) -> bool + Send + Sync + 'static,
	{
		Matcher::Predicate(Arc::new(f))
	}

	pub fn matches(&self, path: &Path) -> bool {
		match self {
			Matcher::Regex(regex) => regex.is_match(&path.to_string_lossy()),
			Matcher::Extension(ext) => path.extension().is_some_and(|e| e == ext.as_str()),
			Matcher::Predicate(f) => f(path),
		}
	}
}

impl fmt::Debug for Matcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Matcher::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
			Matcher::Extension(ext) => f.debug_tuple("Extension").field(ext).finish(),
			Matcher::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

/// A named format handler.
#[derive(Debug, Clone)]
pub struct Loader {
	name: String,
	matcher: Matcher,
	mode: LoadMode,
}

impl Loader {
	pub fn new(name: impl Into<String>, matcher: Matcher, mode: LoadMode) -> Self {
		Loader {
			name: name.into(),
			matcher,
			mode,
		}
	}

	/// A loader usable only by the blocking pipeline.
	pub fn new_sync<F>(name: impl Into<String>, matcher: Matcher, load: F) -> Self
	where
		F: Fn(&Path) -> LoadOutcome + Send + Sync + 'static,
	{
		Loader::new(name, matcher, LoadMode::Sync(Arc::new(load)))
	}

	/// A loader usable only by the async pipeline.
	pub fn new_async<F, Fut>(name: impl Into<String>, matcher: Matcher, load: F) -> Self
	where
		F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = LoadOutcome> + Send + 'static,
	{
		Loader::new(name, matcher, LoadMode::Async(boxed_async(load)))
	}

	/// A loader usable by both pipelines.
	pub fn new_both<S, F, Fut>(name: impl Into<String>, matcher: Matcher, sync: S, future: F) -> Self
	where
		S: Fn(&Path) -> LoadOutcome + Send + Sync + 'static,
		F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = LoadOutcome> + Send + 'static,
	{
		let mode = LoadMode::Both {
			sync: Arc::new(sync),
			future: boxed_async(future),
		};
		Loader::new(name, matcher, mode)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn matcher(&self) -> &Matcher {
		&self.matcher
	}

	pub fn mode(&self) -> &LoadMode {
		&self.mode
	}

	pub fn matches(&self, path: &Path) -> bool {
		self.matcher.matches(path)
	}

	/// Run the blocking load function.
	///
	/// Errors from the loader itself pass through as [`NearconfError::Loader`].
	pub fn load_sync(&self, path: &Path) -> Result<Value> {
		let load = self
			.mode
			.sync_fn()
			.ok_or_else(|| NearconfError::UnsupportedLoadMode {
				loader: self.name.clone(),
				mode: "sync",
			})?;
		load(path).map_err(NearconfError::Loader)
	}

	/// Run the asynchronous load function.
	pub async fn load_async(&self, path: &Path) -> Result<Value> {
		let load = self
			.mode
			.async_fn()
			.ok_or_else(|| NearconfError::UnsupportedLoadMode {
				loader: self.name.clone(),
				mode: "async",
			})?;
		load(path.to_path_buf()).await.map_err(NearconfError::Loader)
	}
}

fn boxed_async<F, Fut>(load: F) -> AsyncLoadFn
where
	F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = LoadOutcome> + Send + 'static,
{
	Arc::new(move |path| Box::pin(load(path)) as LoadFuture)
}
