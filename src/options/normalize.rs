use crate::error::{NearconfError, Result};
use crate::options::types::{Options, Query, ResolvedOptions};
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and fold `..` into the parent.
///
/// Symlinks are not followed. A `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();

	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => match normalized.components().next_back() {
				Some(Component::Normal(_)) => {
					normalized.pop();
				}
				Some(Component::RootDir | Component::Prefix(_)) => {}
				_ => normalized.push(".."),
			},
			other => normalized.push(other.as_os_str()),
		}
	}

	normalized
}

/// Make `path` absolute and normalize it. The working directory is only
/// consulted for relative paths.
fn absolutize<F>(path: &Path, current_dir: &F) -> Result<PathBuf>
where
	F: Fn() -> std::io::Result<PathBuf>,
{
	if path.is_absolute() {
		Ok(normalize_path(path))
	} else {
		Ok(normalize_path(&working_dir(current_dir)?.join(path)))
	}
}

fn working_dir<F>(current_dir: &F) -> Result<PathBuf>
where
	F: Fn() -> std::io::Result<PathBuf>,
{
	current_dir().map_err(|source| NearconfError::CurrentDirUnavailable { source })
}

/// Merge a per-call query over construction-time options.
///
/// Per-call values win. The start directory becomes absolute, the stop
/// directory defaults to the filesystem root of the start directory, and an
/// empty candidate list is a configuration error.
pub fn resolve_options(options: &Options, query: Query) -> Result<ResolvedOptions> {
	resolve_options_with(options, query, std::env::current_dir)
}

fn resolve_options_with<F>(options: &Options, query: Query, current_dir: F) -> Result<ResolvedOptions>
where
	F: Fn() -> std::io::Result<PathBuf>,
{
	let files = query.files.unwrap_or_else(|| options.files.clone());
	if files.is_empty() {
		return Err(NearconfError::NoCandidateFiles);
	}

	let cwd = match query.cwd.or_else(|| options.cwd.clone()) {
		Some(dir) => absolutize(&dir, &current_dir)?,
		None => normalize_path(&working_dir(&current_dir)?),
	};

	let stop_dir = match query.stop_dir.or_else(|| options.stop_dir.clone()) {
		Some(dir) => absolutize(&dir, &current_dir)?,
		None => filesystem_root(&cwd),
	};

	Ok(ResolvedOptions {
		files,
		cwd,
		stop_dir,
		package_key: query.package_key.or_else(|| options.package_key.clone()),
		bypass_cache: options.bypass_cache,
	})
}

/// The outermost ancestor of an absolute path.
fn filesystem_root(path: &Path) -> PathBuf {
	path.ancestors()
		.last()
		.map(Path::to_path_buf)
		.unwrap_or_else(|| path.to_path_buf())
}
