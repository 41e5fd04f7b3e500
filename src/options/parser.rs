use crate::error::{NearconfError, Result};
use crate::options::types::OptionsFile;
use std::path::Path;

/// Parse an options file from the given path.
pub fn parse_options_file(path: &Path) -> Result<OptionsFile> {
	let content = std::fs::read_to_string(path).map_err(|source| NearconfError::ReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_options_str(&content, path)
}

/// Parse options from a string (useful for testing).
pub fn parse_options_str(content: &str, path: &Path) -> Result<OptionsFile> {
	let file: OptionsFile =
		toml::from_str(content).map_err(|source| NearconfError::TomlParseError {
			path: path.to_path_buf(),
			source,
		})?;

	file.validate(path)?;

	Ok(file)
}
