use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

use nearconf::options::parse_options_file;
use nearconf::{ConfigLocator, ModuleRunner, Options, Query, toml_loader};

#[derive(Parser)]
#[command(name = "nearconf")]
#[command(
	author,
	version,
	about = "Find and load the nearest configuration file"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Log search progress to stderr (repeat for more detail)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
	/// Print the path of the nearest matching file
	Resolve(SearchArgs),
	/// Print the nearest matching file and its data as JSON
	Load(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
	/// Candidate file names, in priority order
	files: Vec<String>,

	/// Directory to start searching from
	#[arg(long, value_name = "DIR")]
	cwd: Option<PathBuf>,

	/// Directory at which the search stops (not searched itself)
	#[arg(long, value_name = "DIR")]
	stop_dir: Option<PathBuf>,

	/// Only accept package.json when it has this key
	#[arg(long, value_name = "KEY")]
	package_key: Option<String>,

	/// Always check the filesystem instead of the existence cache
	#[arg(long)]
	bypass_cache: bool,

	/// Program used to evaluate .js/.cjs files
	#[arg(long, value_name = "PROGRAM")]
	module_runner: Option<String>,

	/// Argument passed to the module runner before the module path
	#[arg(long, value_name = "ARG", requires = "module_runner", allow_hyphen_values = true)]
	module_runner_arg: Vec<String>,

	/// TOML file with default search options
	#[arg(long, value_name = "FILE")]
	config: Option<PathBuf>,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match run(cli.command) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => Level::WARN,
		1 => Level::DEBUG,
		_ => Level::TRACE,
	};
	tracing_subscriber::fmt()
		.with_max_level(level)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn run(command: Commands) -> Result<ExitCode> {
	match command {
		Commands::Resolve(args) => handle_resolve(args),
		Commands::Load(args) => handle_load(args),
	}
}

fn handle_resolve(args: SearchArgs) -> Result<ExitCode> {
	let (mut locator, query) = build_locator(args)?;

	match locator.resolve(query).context("Failed to resolve configuration")? {
		Some(path) => {
			println!("{}", path.display());
			Ok(ExitCode::SUCCESS)
		}
		None => Ok(ExitCode::FAILURE),
	}
}

fn handle_load(args: SearchArgs) -> Result<ExitCode> {
	let (mut locator, query) = build_locator(args)?;

	let result = locator.load(query).context("Failed to load configuration")?;
	let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
	println!("{}", json);

	Ok(ExitCode::SUCCESS)
}

/// Build the locator from an optional options file, with flags taking precedence.
fn build_locator(args: SearchArgs) -> Result<(ConfigLocator, Query)> {
	let mut options = match args.config {
		Some(ref path) => load_options_file(path)?,
		None => Options::new(),
	};

	if args.bypass_cache {
		options.bypass_cache = true;
	}
	if let Some(program) = args.module_runner {
		options.module_runner = ModuleRunner::new(program).args(args.module_runner_arg);
	}

	let mut query = Query::new();
	if !args.files.is_empty() {
		query = query.files(args.files);
	}
	query.cwd = args.cwd;
	query.stop_dir = args.stop_dir;
	query.package_key = args.package_key;

	let mut locator = ConfigLocator::new(options);
	locator.register_loader(toml_loader());

	Ok((locator, query))
}

fn load_options_file(path: &Path) -> Result<Options> {
	let file = parse_options_file(path)
		.with_context(|| format!("Failed to load options file {}", path.display()))?;
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let base_dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
		_ => cwd,
	};
	Ok(file.into_options(&base_dir))
}
