use crate::loader::Loader;
use std::path::Path;
use tracing::trace;

/// Opaque handle for a registered loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(u64);

/// Loaders in registration order. The first matching loader wins.
#[derive(Debug, Default)]
pub struct LoaderRegistry {
	entries: Vec<(LoaderId, Loader)>,
	next_id: u64,
}

impl LoaderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a loader and return its handle.
	pub fn register(&mut self, loader: Loader) -> LoaderId {
		let id = LoaderId(self.next_id);
		self.next_id += 1;
		trace!(loader = loader.name(), ?id, "registered loader");
		self.entries.push((id, loader));
		id
	}

	/// Remove the loader with this handle. Returns it if it was registered.
	pub fn remove(&mut self, id: LoaderId) -> Option<Loader> {
		let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
		Some(self.entries.remove(index).1)
	}

	/// Remove every loader with this name. Returns how many were removed.
	pub fn remove_named(&mut self, name: &str) -> usize {
		let before = self.entries.len();
		self.entries.retain(|(_, loader)| loader.name() != name);
		before - self.entries.len()
	}

	/// Find the first registered loader whose matcher accepts `path`.
	pub fn find_match(&self, path: &Path) -> Option<&Loader> {
		self.entries
			.iter()
			.map(|(_, loader)| loader)
			.find(|loader| loader.matches(path))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
