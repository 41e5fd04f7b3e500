use crate::error::{NearconfError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Output, Stdio};
use tracing::debug;

/// Extensions evaluated as code modules by the default loader.
pub const MODULE_EXTENSIONS: &[&str] = &["js", "cjs"];

/// Node script that prints the JSON form of the module's export.
///
/// Exports JSON cannot represent (`undefined`, functions) print nothing.
const NODE_EVAL_SCRIPT: &str = "process.stdout.write(JSON.stringify(require(require('path').resolve(process.argv[1]))) ?? '')";

/// External program that evaluates a code module and prints its exported
/// value as JSON on stdout.
///
/// Invoked as `<program> <args..> <module path>`. Every run spawns a fresh
/// process, so nothing the module did on a previous evaluation is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRunner {
	program: String,
	args: Vec<String>,
}

impl Default for ModuleRunner {
	/// `node -e <script>`.
	fn default() -> Self {
		ModuleRunner::new("node").args(["-e", NODE_EVAL_SCRIPT])
	}
}

impl ModuleRunner {
	pub fn new(program: impl Into<String>) -> Self {
		ModuleRunner {
			program: program.into(),
			args: Vec::new(),
		}
	}

	/// Arguments placed before the module path.
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn program(&self) -> &str {
		&self.program
	}

	pub fn leading_args(&self) -> &[String] {
		&self.args
	}

	/// Evaluate a module with a blocking process call.
	pub fn run(&self, module_path: &Path) -> Result<Value> {
		ensure_present(module_path)?;
		debug!(program = %self.program, module = %module_path.display(), "evaluating module");

		let output = self
			.command(module_path)
			.output()
			.map_err(|source| self.spawn_error(module_path, source))?;

		decode_output(module_path, output)
	}

	/// Evaluate a module without blocking the runtime thread.
	pub async fn run_async(&self, module_path: &Path) -> Result<Value> {
		if let Err(source) = tokio::fs::metadata(module_path).await {
			return Err(NearconfError::ReadError {
				path: module_path.to_path_buf(),
				source,
			});
		}
		debug!(program = %self.program, module = %module_path.display(), "evaluating module");

		let output = tokio::process::Command::from(self.command(module_path))
			.output()
			.await
			.map_err(|source| self.spawn_error(module_path, source))?;

		decode_output(module_path, output)
	}

	fn command(&self, module_path: &Path) -> std::process::Command {
		let mut cmd = std::process::Command::new(&self.program);
		cmd.args(&self.args)
			.arg(module_path)
			.envs(build_module_env(module_path))
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit());

		if let Some(dir) = module_path.parent() {
			cmd.current_dir(dir);
		}

		cmd
	}

	fn spawn_error(&self, module_path: &Path, source: std::io::Error) -> NearconfError {
		if source.kind() == std::io::ErrorKind::NotFound {
			NearconfError::ModuleRunnerNotFound {
				program: self.program.clone(),
			}
		} else {
			NearconfError::ModuleFailed {
				path: module_path.to_path_buf(),
				source,
			}
		}
	}
}

/// Build environment variables describing the module being evaluated.
pub fn build_module_env(module_path: &Path) -> HashMap<String, String> {
	let mut env = HashMap::new();

	env.insert(
		"NEARCONF_MODULE_PATH".to_string(),
		module_path.to_string_lossy().to_string(),
	);

	if let Some(dir) = module_path.parent() {
		env.insert(
			"NEARCONF_MODULE_DIR".to_string(),
			dir.to_string_lossy().to_string(),
		);
	}

	env
}

/// Whether the path has a code module extension.
pub fn is_module_path(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

fn ensure_present(module_path: &Path) -> Result<()> {
	std::fs::metadata(module_path)
		.map(|_| ())
		.map_err(|source| NearconfError::ReadError {
			path: module_path.to_path_buf(),
			source,
		})
}

fn decode_output(module_path: &Path, output: Output) -> Result<Value> {
	if !output.status.success() {
		return Err(NearconfError::ModuleNonZeroExit {
			path: module_path.to_path_buf(),
			exit_code: output.status.code().unwrap_or(-1),
		});
	}

	if output.stdout.trim_ascii().is_empty() {
		return Err(NearconfError::ModuleOutputEmpty {
			path: module_path.to_path_buf(),
		});
	}

	serde_json::from_slice(&output.stdout).map_err(|source| NearconfError::ModuleOutputInvalid {
		path: module_path.to_path_buf(),
		source,
	})
}
