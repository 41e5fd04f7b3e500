use crate::error::{BoxError, NearconfError};
use crate::loader::{Loader, Matcher};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Name the bundled TOML loader registers under.
pub const TOML_LOADER_NAME: &str = "toml";

/// Loader for `.toml` files, usable by both pipelines.
///
/// Tables become JSON objects. Not registered by default.
pub fn toml_loader() -> Loader {
	Loader::new_both(
		TOML_LOADER_NAME,
		Matcher::extension("toml"),
		load_toml,
		load_toml_async,
	)
}

fn load_toml(path: &Path) -> Result<Value, BoxError> {
	let content = std::fs::read_to_string(path).map_err(|source| read_error(path, source))?;
	parse_toml(&content, path)
}

async fn load_toml_async(path: PathBuf) -> Result<Value, BoxError> {
	let content = tokio::fs::read_to_string(&path)
		.await
		.map_err(|source| read_error(&path, source))?;
	parse_toml(&content, &path)
}

fn read_error(path: &Path, source: std::io::Error) -> BoxError {
	Box::new(NearconfError::ReadError {
		path: path.to_path_buf(),
		source,
	})
}

fn parse_toml(content: &str, path: &Path) -> Result<Value, BoxError> {
	::toml::from_str::<Value>(content).map_err(|source| {
		Box::new(NearconfError::TomlParseError {
			path: path.to_path_buf(),
			source,
		}) as BoxError
	})
}
