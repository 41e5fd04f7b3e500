use crate::error::{BoxError, NearconfError, Result};
use crate::loader::ModuleRunner;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type ParseFn = dyn Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync;

/// Function turning manifest-like text into a value.
///
/// Defaults to strict JSON parsing.
#[derive(Clone)]
pub struct TextParser(Arc<ParseFn>);

impl TextParser {
	pub fn new<F>(parse: F) -> Self
	where
		F: Fn(&str) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
	{
		TextParser(Arc::new(parse))
	}

	/// Strict JSON parser backed by `serde_json`.
	pub fn json() -> Self {
		TextParser::new(|text| serde_json::from_str(text).map_err(BoxError::from))
	}

	pub fn parse(&self, text: &str) -> std::result::Result<Value, BoxError> {
		(self.0)(text)
	}
}

impl Default for TextParser {
	fn default() -> Self {
		TextParser::json()
	}
}

impl fmt::Debug for TextParser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("TextParser(..)")
	}
}

/// Construction-time options of a [`ConfigLocator`](crate::ConfigLocator).
///
/// Every field may be overridden per call through a [`Query`], except the
/// parser, the module runner and the cache bypass flag.
#[derive(Debug, Clone, Default)]
pub struct Options {
	/// Candidate file names, searched in order in each directory.
	pub files: Vec<String>,

	/// Directory the search starts from. Defaults to the process working directory.
	pub cwd: Option<PathBuf>,

	/// Directory at which the upward walk halts. Defaults to the root of `cwd`.
	pub stop_dir: Option<PathBuf>,

	/// Key that must exist in a `package.json` for it to count as a match.
	pub package_key: Option<String>,

	/// Parser for `package.json` and `.json` files.
	pub parse_text: TextParser,

	/// Skip existence-cache lookups and always check the filesystem.
	pub bypass_cache: bool,

	/// Program used to evaluate code modules (`.js`, `.cjs`).
	pub module_runner: ModuleRunner,
}

impl Options {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn files<I, S>(mut self, files: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.files = files.into_iter().map(Into::into).collect();
		self
	}

	pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	pub fn stop_dir(mut self, stop_dir: impl Into<PathBuf>) -> Self {
		self.stop_dir = Some(stop_dir.into());
		self
	}

	pub fn package_key(mut self, key: impl Into<String>) -> Self {
		self.package_key = Some(key.into());
		self
	}

	pub fn parse_text(mut self, parser: TextParser) -> Self {
		self.parse_text = parser;
		self
	}

	pub fn bypass_cache(mut self, bypass: bool) -> Self {
		self.bypass_cache = bypass;
		self
	}

	pub fn module_runner(mut self, runner: ModuleRunner) -> Self {
		self.module_runner = runner;
		self
	}
}

/// Per-call arguments to `resolve` and `load`.
///
/// Set fields take precedence over the construction-time [`Options`].
/// Both calling conventions convert into a query: positional
/// (`["a.json"]`, `(files, cwd)`, `(files, cwd, stop_dir)`) and the
/// builder form (`Query::new().files(..).cwd(..)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
	pub files: Option<Vec<String>>,
	pub cwd: Option<PathBuf>,
	pub stop_dir: Option<PathBuf>,
	pub package_key: Option<String>,
}

impl Query {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn files<I, S>(mut self, files: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.files = Some(files.into_iter().map(Into::into).collect());
		self
	}

	pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
		self.cwd = Some(cwd.into());
		self
	}

	pub fn stop_dir(mut self, stop_dir: impl Into<PathBuf>) -> Self {
		self.stop_dir = Some(stop_dir.into());
		self
	}

	pub fn package_key(mut self, key: impl Into<String>) -> Self {
		self.package_key = Some(key.into());
		self
	}
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Query {
	fn from(files: [S; N]) -> Self {
		Query::new().files(files)
	}
}

impl<S: Into<String>> From<Vec<S>> for Query {
	fn from(files: Vec<S>) -> Self {
		Query::new().files(files)
	}
}

impl<F, C> From<(F, C)> for Query
where
	F: IntoIterator,
	F::Item: Into<String>,
	C: Into<PathBuf>,
{
	fn from((files, cwd): (F, C)) -> Self {
		Query::new().files(files).cwd(cwd)
	}
}

impl<F, C, D> From<(F, C, D)> for Query
where
	F: IntoIterator,
	F::Item: Into<String>,
	C: Into<PathBuf>,
	D: Into<PathBuf>,
{
	fn from((files, cwd, stop_dir): (F, C, D)) -> Self {
		Query::new().files(files).cwd(cwd).stop_dir(stop_dir)
	}
}

/// Options a single search runs with, after merging and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
	/// Non-empty list of candidate file names.
	pub files: Vec<String>,

	/// Absolute, lexically normalized start directory.
	pub cwd: PathBuf,

	/// Absolute, lexically normalized stop directory.
	pub stop_dir: PathBuf,

	pub package_key: Option<String>,

	pub bypass_cache: bool,
}

/// Construction defaults read from a TOML options file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OptionsFile {
	/// Candidate file names.
	#[serde(default)]
	pub files: Vec<String>,

	/// Start directory, relative to the options file when not absolute.
	#[serde(default)]
	pub cwd: Option<PathBuf>,

	/// Stop directory, relative to the options file when not absolute.
	#[serde(default)]
	pub stop_dir: Option<PathBuf>,

	#[serde(default)]
	pub package_key: Option<String>,

	#[serde(default)]
	pub bypass_cache: bool,

	/// Program and leading arguments used to evaluate code modules.
	#[serde(default)]
	pub module_runner: Option<Vec<String>>,
}

impl OptionsFile {
	/// Reject values that could never produce a working search.
	pub fn validate(&self, path: &Path) -> Result<()> {
		let invalid = |message: &str| NearconfError::InvalidOptionsFile {
			path: path.to_path_buf(),
			message: message.to_string(),
		};

		if self.files.iter().any(|name| name.is_empty()) {
			return Err(invalid("`files` must not contain empty names"));
		}
		if self.package_key.as_deref() == Some("") {
			return Err(invalid("`package-key` must not be empty"));
		}
		if let Some(ref runner) = self.module_runner
			&& runner.first().is_none_or(|program| program.is_empty())
		{
			return Err(invalid("`module-runner` needs a program name"));
		}

		Ok(())
	}

	/// Turn the file into [`Options`], anchoring relative directories at `base_dir`.
	pub fn into_options(self, base_dir: &Path) -> Options {
		let anchor = |dir: PathBuf| {
			if dir.is_absolute() {
				dir
			} else {
				base_dir.join(dir)
			}
		};

		let mut options = Options::new().files(self.files).bypass_cache(self.bypass_cache);
		options.cwd = self.cwd.map(anchor);
		options.stop_dir = self.stop_dir.map(anchor);
		options.package_key = self.package_key;
		if let Some(runner) = self.module_runner
			&& let Some((program, args)) = runner.split_first()
		{
			options.module_runner = ModuleRunner::new(program.clone()).args(args.iter().cloned());
		}
		options
	}
}
