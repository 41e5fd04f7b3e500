//! Nearconf - find and load the nearest configuration file.
//!
//! This library provides:
//! - An upward directory search over an ordered list of candidate file names
//! - `package.json` lookups that only match when a given key is present
//! - Pluggable loaders chosen by path, with a JSON/text/module default
//! - Per-instance caching of existence checks, manifests and loaded data
//!
//! # Example
//!
//! ```no_run
//! use nearconf::{ConfigLocator, Options};
//!
//! let mut locator = ConfigLocator::new(Options::new().package_key("tool"));
//! let result = locator.load(["tool.config.json", "package.json"]).unwrap();
//!
//! if let (Some(path), Some(data)) = (result.path, result.data) {
//!     println!("Loaded {}: {}", path.display(), data);
//! }
//! ```

pub mod cache;
pub mod error;
pub mod loader;
pub mod locator;
pub mod options;
pub mod resolve;

pub use error::{BoxError, NearconfError, Result};
pub use loader::{LoadMode, Loader, LoaderId, Matcher, ModuleRunner, toml_loader};
pub use locator::{ConfigLocator, LoadResult};
pub use options::{Options, Query, TextParser};
