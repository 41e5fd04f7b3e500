//! Upward directory search for the nearest candidate file.

pub mod walker;

pub use walker::{MANIFEST_FILE_NAME, SANDBOX_DIR_NAME, Walker, is_manifest, search_dirs};
