use std::path::PathBuf;

/// Boxed error returned by loaders and text parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Library-level structured errors for nearconf.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum NearconfError {
	#[error("No candidate files given: `files` must be a non-empty list")]
	NoCandidateFiles,

	#[error("Failed to determine the current directory")]
	CurrentDirUnavailable {
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to read file: {path}")]
	ReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse file: {path}")]
	ParseError {
		path: PathBuf,
		#[source]
		source: BoxError,
	},

	#[error("Failed to parse TOML file: {path}")]
	TomlParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid options file: {path}: {message}")]
	InvalidOptionsFile { path: PathBuf, message: String },

	#[error("Invalid loader pattern: {pattern}")]
	InvalidRegex {
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Loader `{loader}` has no {mode} load function")]
	UnsupportedLoadMode { loader: String, mode: &'static str },

	#[error("Module runner not found: {program}")]
	ModuleRunnerNotFound { program: String },

	#[error("Module evaluation failed: {path}")]
	ModuleFailed {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Module evaluation returned non-zero exit code: {path} (exit code: {exit_code})")]
	ModuleNonZeroExit { path: PathBuf, exit_code: i32 },

	#[error("Module evaluation printed nothing (export is not JSON-serializable): {path}")]
	ModuleOutputEmpty { path: PathBuf },

	#[error("Module evaluation produced invalid JSON: {path}")]
	ModuleOutputInvalid {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// An error raised by a registered loader, passed through as-is.
	#[error(transparent)]
	Loader(BoxError),
}

impl NearconfError {
	/// Whether this error means the file disappeared after its existence check.
	///
	/// Only reads done by nearconf itself qualify. Errors from registered
	/// loaders always propagate, even when they wrap a `NotFound`.
	pub fn is_vanished_file(&self) -> bool {
		match self {
			NearconfError::ReadError { source, .. } => {
				source.kind() == std::io::ErrorKind::NotFound
			}
			_ => false,
		}
	}
}

/// Result type alias using NearconfError.
pub type Result<T> = std::result::Result<T, NearconfError>;
