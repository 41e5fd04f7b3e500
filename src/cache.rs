//! Per-instance caches keyed by absolute path.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A map from absolute file path to a cached value.
#[derive(Debug, Clone)]
pub struct PathCache<T> {
	entries: HashMap<PathBuf, T>,
}

impl<T> Default for PathCache<T> {
	fn default() -> Self {
		PathCache {
			entries: HashMap::new(),
		}
	}
}

impl<T> PathCache<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, path: &Path) -> Option<&T> {
		self.entries.get(path)
	}

	pub fn contains(&self, path: &Path) -> bool {
		self.entries.contains_key(path)
	}

	pub fn insert(&mut self, path: impl Into<PathBuf>, value: T) {
		self.entries.insert(path.into(), value);
	}

	/// Drop the entry for one path.
	pub fn invalidate(&mut self, path: &Path) -> Option<T> {
		self.entries.remove(path)
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Whether a candidate path was observed to exist.
pub type ExistsCache = PathCache<bool>;

/// Parsed `package.json` files whose package key lookup succeeded.
pub type ManifestCache = PathCache<Value>;

/// Data already produced by a loader for a resolved path.
pub type LoadCache = PathCache<Value>;
