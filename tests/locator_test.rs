use nearconf::{
	BoxError, ConfigLocator, LoadResult, Loader, Matcher, NearconfError, Options, Query,
	TextParser,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A temp tree and a stop directory just above it, so nothing outside leaks in.
struct Tree {
	temp: tempfile::TempDir,
}

impl Tree {
	fn new() -> Self {
		Tree {
			temp: tempfile::tempdir().unwrap(),
		}
	}

	fn root(&self) -> &Path {
		self.temp.path()
	}

	fn stop_dir(&self) -> PathBuf {
		self.root().parent().unwrap().to_path_buf()
	}

	fn dir(&self, rel: &str) -> PathBuf {
		let dir = self.root().join(rel);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	fn write(&self, rel: &str, content: &str) -> PathBuf {
		let path = self.root().join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(&path, content).unwrap();
		path
	}

	fn locator(&self) -> ConfigLocator {
		ConfigLocator::new(Options::new().stop_dir(self.stop_dir()))
	}
}

fn counting_loader(name: &str, pattern: &str, calls: &Arc<AtomicUsize>) -> Loader {
	let calls = Arc::clone(calls);
	let name_value = name.to_string();
	Loader::new_sync(name, Matcher::regex(pattern).unwrap(), move |_| {
		calls.fetch_add(1, Ordering::SeqCst);
		Ok(json!(name_value))
	})
}

// ============================================================================
// resolve
// ============================================================================

#[test]
fn test_resolve_has_json_file() {
	let tree = Tree::new();
	let foo = tree.write("foo.json", r#"{"foo": "foo"}"#);

	let path = tree.locator().resolve((["foo.json"], tree.root())).unwrap();
	assert_eq!(path, Some(foo));
}

#[test]
fn test_resolve_next_file_in_list() {
	let tree = Tree::new();
	let foo = tree.write("foo.json", "{}");

	let path = tree
		.locator()
		.resolve((["bar.json", "foo.json"], tree.root()))
		.unwrap();
	assert_eq!(path, Some(foo));
}

#[test]
fn test_resolve_not_found_is_none() {
	let tree = Tree::new();
	tree.write("foo.json", "{}");

	let mut locator = tree.locator();
	assert_eq!(locator.resolve((["hehe.json"], tree.root())).unwrap(), None);
	assert_eq!(
		locator.load((["hehe.json"], tree.root())).unwrap(),
		LoadResult::empty()
	);
}

#[test]
fn test_nearer_directory_beats_list_order() {
	let tree = Tree::new();
	tree.write("a.json", "{}");
	let child = tree.dir("x/y");
	let b = tree.write("x/y/b.json", "{}");

	let path = tree.locator().resolve((["a.json", "b.json"], &child)).unwrap();
	assert_eq!(path, Some(b));
}

#[test]
fn test_list_order_within_directory() {
	let tree = Tree::new();
	let a = tree.write("a.json", "{}");
	tree.write("b.json", "{}");

	let path = tree.locator().resolve((["a.json", "b.json"], tree.root())).unwrap();
	assert_eq!(path, Some(a));
}

#[test]
fn test_walk_halts_at_node_modules() {
	let tree = Tree::new();
	tree.write("conf.json", "{}");
	let inside = tree.dir("node_modules/pkg");

	let path = tree.locator().resolve((["conf.json"], &inside)).unwrap();
	assert_eq!(path, None);
}

#[test]
fn test_stop_dir_is_excluded() {
	let tree = Tree::new();
	tree.write("conf.json", "{}");
	let child = tree.dir("child");

	let mut locator = ConfigLocator::default();
	let path = locator
		.resolve((["conf.json"], &child, tree.root()))
		.unwrap();
	assert_eq!(path, None);
}

#[test]
fn test_construction_defaults_and_query_precedence() {
	let tree = Tree::new();
	let a = tree.write("a.json", "{}");
	let b = tree.write("b.json", "{}");

	let mut locator = ConfigLocator::new(
		Options::new()
			.files(["a.json"])
			.cwd(tree.root())
			.stop_dir(tree.stop_dir()),
	);
	assert_eq!(locator.resolve(Query::new()).unwrap(), Some(a));
	assert_eq!(locator.resolve(["b.json"]).unwrap(), Some(b));
}

#[test]
fn test_repeated_resolution_is_stable() {
	let tree = Tree::new();
	let child = tree.dir("deep/er");
	let conf = tree.write("conf.json", "{}");

	let mut locator = tree.locator();
	let first = locator.resolve((["missing.json", "conf.json"], &child)).unwrap();
	let second = locator.resolve((["missing.json", "conf.json"], &child)).unwrap();
	assert_eq!(first, Some(conf));
	assert_eq!(first, second);
}

#[test]
fn test_existence_cache_until_cleared() {
	let tree = Tree::new();
	let mut locator = tree.locator();

	assert_eq!(locator.resolve((["late.json"], tree.root())).unwrap(), None);

	let late = tree.write("late.json", "{}");
	// Cached negative lookup is still served.
	assert_eq!(locator.resolve((["late.json"], tree.root())).unwrap(), None);

	locator.clear_cache();
	assert_eq!(
		locator.resolve((["late.json"], tree.root())).unwrap(),
		Some(late)
	);
}

#[test]
fn test_bypass_cache_always_hits_filesystem() {
	let tree = Tree::new();
	let mut locator = ConfigLocator::new(
		Options::new()
			.stop_dir(tree.stop_dir())
			.bypass_cache(true),
	);

	assert_eq!(locator.resolve((["late.json"], tree.root())).unwrap(), None);
	let late = tree.write("late.json", "{}");
	assert_eq!(
		locator.resolve((["late.json"], tree.root())).unwrap(),
		Some(late)
	);
}

#[test]
fn test_empty_files_is_config_error() {
	let tree = Tree::new();
	let result = tree.locator().resolve((Vec::<String>::new(), tree.root()));
	assert!(matches!(result, Err(NearconfError::NoCandidateFiles)));
}

// ============================================================================
// package key
// ============================================================================

#[test]
fn test_package_key_missing_falls_through() {
	let tree = Tree::new();
	tree.write("package.json", r#"{"name": "demo"}"#);
	let foo = tree.write("foo.json", r#"{"foo": true}"#);

	let mut locator = ConfigLocator::new(
		Options::new()
			.package_key("name-that-is-absent")
			.stop_dir(tree.stop_dir()),
	);
	let result = locator.load((["package.json", "foo.json"], tree.root())).unwrap();
	assert_eq!(result, LoadResult::found(foo, json!({"foo": true})));
}

#[test]
fn test_package_key_present_loads_key_value() {
	let tree = Tree::new();
	let manifest = tree.write("package.json", r#"{"what": true}"#);
	tree.write("foo.json", "{}");

	let mut locator = ConfigLocator::new(
		Options::new()
			.package_key("what")
			.stop_dir(tree.stop_dir()),
	);
	let result = locator.load((["package.json", "foo.json"], tree.root())).unwrap();
	assert_eq!(result, LoadResult::found(manifest, json!({"what": true})));
}

#[test]
fn test_package_json_without_key_option_is_plain_candidate() {
	let tree = Tree::new();
	let manifest = tree.write("package.json", r#"{"name": "demo"}"#);

	let result = tree
		.locator()
		.load((["package.json"], tree.root()))
		.unwrap();
	assert_eq!(result, LoadResult::found(manifest, json!({"name": "demo"})));
}

#[test]
fn test_package_key_in_ancestor_manifest() {
	let tree = Tree::new();
	let outer = tree.write("package.json", r#"{"tool": {"level": "outer"}}"#);
	tree.write("pkg/package.json", r#"{"name": "inner"}"#);
	let inner_dir = tree.dir("pkg/src");

	let mut locator = tree.locator();
	let result = locator
		.load(Query::new().files(["package.json"]).cwd(&inner_dir).package_key("tool"))
		.unwrap();
	assert_eq!(
		result,
		LoadResult::found(outer, json!({"tool": {"level": "outer"}}))
	);
}

#[test]
fn test_custom_text_parser_used_for_manifest() {
	let tree = Tree::new();
	let manifest = tree.write("package.json", "what=yes");

	let parser = TextParser::new(|text| {
		let (key, value) = text.split_once('=').ok_or("missing '='")?;
		Ok(json!({ key.trim(): value.trim() }))
	});
	let mut locator = ConfigLocator::new(
		Options::new()
			.package_key("what")
			.parse_text(parser)
			.stop_dir(tree.stop_dir()),
	);
	let result = locator.load((["package.json"], tree.root())).unwrap();
	assert_eq!(result, LoadResult::found(manifest, json!({"what": "yes"})));
}

// ============================================================================
// loaders
// ============================================================================

#[test]
fn test_loader_runs_once_per_path() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));

	let mut locator = tree.locator();
	locator.register_loader(counting_loader("yaml", r"\.yaml$", &calls));

	let first = locator.load((["conf.yaml"], tree.root())).unwrap();
	let second = locator.load((["conf.yaml"], tree.root())).unwrap();
	assert_eq!(first, second);
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	locator.clear_cache();
	locator.load((["conf.yaml"], tree.root())).unwrap();
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_earliest_registered_loader_wins() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));

	let mut locator = tree.locator();
	locator
		.register_loader(counting_loader("first", r"\.yaml$", &calls))
		.register_loader(counting_loader("second", r"conf\.yaml$", &calls));

	let result = locator.load((["conf.yaml"], tree.root())).unwrap();
	assert_eq!(result.data, Some(json!("first")));
}

#[test]
fn test_unregister_falls_back_to_default() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));

	let mut locator = tree.locator();
	locator
		.register_loader(counting_loader("yaml", r"\.yaml$", &calls))
		.unregister_loader("yaml");

	let result = locator.load((["conf.yaml"], tree.root())).unwrap();
	assert_eq!(result.data, Some(json!("a: 1\n")));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_remove_loader_by_id() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));

	let mut locator = tree.locator();
	let id = locator.add_loader(counting_loader("yaml", r"\.yaml$", &calls));
	locator.register_loader(counting_loader("fallback", r"\.yaml$", &calls));
	locator.remove_loader(id);

	let result = locator.load((["conf.yaml"], tree.root())).unwrap();
	assert_eq!(result.data, Some(json!("fallback")));
}

#[test]
fn test_loader_error_propagates_and_is_not_cached() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);

	let mut locator = tree.locator();
	locator.register_loader(Loader::new_sync(
		"broken",
		Matcher::extension("yaml"),
		move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
			Err(BoxError::from("yaml is not supported here"))
		},
	));

	let err = locator.load((["conf.yaml"], tree.root())).unwrap_err();
	assert_eq!(err.to_string(), "yaml is not supported here");
	assert!(locator.load((["conf.yaml"], tree.root())).is_err());
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_async_only_loader_in_sync_pipeline_is_error() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");

	let mut locator = tree.locator();
	locator.register_loader(Loader::new_async(
		"async-yaml",
		Matcher::extension("yaml"),
		|_| async { Ok::<_, BoxError>(json!("async")) },
	));

	let err = locator.load((["conf.yaml"], tree.root())).unwrap_err();
	assert!(matches!(
		err,
		NearconfError::UnsupportedLoadMode { mode: "sync", .. }
	));
}

#[test]
fn test_vanished_file_is_treated_as_not_found() {
	let tree = Tree::new();
	let conf = tree.write("conf.json", "{}");

	let mut locator = tree.locator();
	assert_eq!(
		locator.resolve((["conf.json"], tree.root())).unwrap(),
		Some(conf.clone())
	);

	// The existence cache still believes the file is there.
	fs::remove_file(&conf).unwrap();
	assert_eq!(
		locator.load((["conf.json"], tree.root())).unwrap(),
		LoadResult::empty()
	);

	// The stale entry was dropped, so a recreated file is found again.
	fs::write(&conf, r#"{"back": true}"#).unwrap();
	let result = locator.load((["conf.json"], tree.root())).unwrap();
	assert_eq!(result, LoadResult::found(conf, json!({"back": true})));
}

#[test]
fn test_loader_not_found_for_included_file_propagates() {
	let tree = Tree::new();
	let conf = tree.write("conf.yaml", "extends: ./base.yaml\n");

	let mut locator = tree.locator();
	locator.register_loader(Loader::new_sync(
		"yaml-extends",
		Matcher::extension("yaml"),
		|path| {
			let base = path.with_file_name("base.yaml");
			let text = fs::read_to_string(base)?;
			Ok(json!(text))
		},
	));

	let err = locator.load((["conf.yaml"], tree.root())).unwrap_err();
	match err {
		NearconfError::Loader(inner) => {
			let io = inner.downcast_ref::<std::io::Error>().unwrap();
			assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
		}
		other => panic!("Expected Loader error, got {other:?}"),
	}

	// The resolved file is still known to exist.
	assert_eq!(
		locator.resolve((["conf.yaml"], tree.root())).unwrap(),
		Some(conf)
	);
}

#[test]
fn test_malformed_json_propagates() {
	let tree = Tree::new();
	tree.write("conf.json", "{ not json");

	let err = tree
		.locator()
		.load((["conf.json"], tree.root()))
		.unwrap_err();
	assert!(matches!(err, NearconfError::ParseError { .. }));
}

#[test]
fn test_toml_loader_registration() {
	let tree = Tree::new();
	let conf = tree.write("tool.toml", "port = 8080\n");

	let mut locator = tree.locator();
	locator.register_loader(nearconf::toml_loader());
	let result = locator.load((["tool.toml"], tree.root())).unwrap();
	assert_eq!(result, LoadResult::found(conf, json!({"port": 8080})));
}

// ============================================================================
// async pipeline
// ============================================================================

#[tokio::test]
async fn test_async_resolve_and_load_match_sync() {
	let tree = Tree::new();
	tree.write("package.json", r#"{"what": {"x": 1}}"#);
	tree.write("foo.json", r#"{"foo": "foo"}"#);
	let child = tree.dir("child");

	let query = Query::new()
		.files(["bar.json", "package.json", "foo.json"])
		.cwd(&child)
		.package_key("what");

	let mut sync_locator = tree.locator();
	let mut async_locator = tree.locator();

	assert_eq!(
		async_locator.resolve_async(query.clone()).await.unwrap(),
		sync_locator.resolve(query.clone()).unwrap()
	);
	assert_eq!(
		async_locator.load_async(query.clone()).await.unwrap(),
		sync_locator.load(query).unwrap()
	);
}

#[tokio::test]
async fn test_async_not_found() {
	let tree = Tree::new();
	let mut locator = tree.locator();

	assert_eq!(
		locator.resolve_async((["hehe.json"], tree.root())).await.unwrap(),
		None
	);
	assert!(
		locator
			.load_async((["hehe.json"], tree.root()))
			.await
			.unwrap()
			.is_empty()
	);
}

#[tokio::test]
async fn test_async_loader_runs_once() {
	let tree = Tree::new();
	let conf = tree.write("conf.ini", "[a]\n");
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);

	let mut locator = tree.locator();
	locator.register_loader(Loader::new_async(
		"ini",
		Matcher::extension("ini"),
		move |path| {
			counter.fetch_add(1, Ordering::SeqCst);
			async move {
				let text = tokio::fs::read_to_string(&path).await?;
				Ok::<_, BoxError>(json!({"raw": text}))
			}
		},
	));

	let first = locator.load_async((["conf.ini"], tree.root())).await.unwrap();
	let second = locator.load_async((["conf.ini"], tree.root())).await.unwrap();
	assert_eq!(first, LoadResult::found(conf, json!({"raw": "[a]\n"})));
	assert_eq!(first, second);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_vanished_file_is_treated_as_not_found() {
	let tree = Tree::new();
	let conf = tree.write("conf.json", "{}");

	let mut locator = tree.locator();
	assert_eq!(
		locator.resolve_async((["conf.json"], tree.root())).await.unwrap(),
		Some(conf.clone())
	);

	fs::remove_file(&conf).unwrap();
	assert_eq!(
		locator.load_async((["conf.json"], tree.root())).await.unwrap(),
		LoadResult::empty()
	);

	fs::write(&conf, r#"{"back": true}"#).unwrap();
	let result = locator.load_async((["conf.json"], tree.root())).await.unwrap();
	assert_eq!(result, LoadResult::found(conf, json!({"back": true})));
}

#[tokio::test]
async fn test_async_malformed_json_propagates() {
	let tree = Tree::new();
	tree.write("conf.json", "{ not json");

	let err = tree
		.locator()
		.load_async((["conf.json"], tree.root()))
		.await
		.unwrap_err();
	assert!(matches!(err, NearconfError::ParseError { .. }));
}

#[tokio::test]
async fn test_async_loader_not_found_for_included_file_propagates() {
	let tree = Tree::new();
	tree.write("conf.yaml", "extends: ./base.yaml\n");

	let mut locator = tree.locator();
	locator.register_loader(Loader::new_async(
		"yaml-extends",
		Matcher::extension("yaml"),
		|path: PathBuf| async move {
			let text = tokio::fs::read_to_string(path.with_file_name("base.yaml")).await?;
			Ok::<_, BoxError>(json!(text))
		},
	));

	let err = locator
		.load_async((["conf.yaml"], tree.root()))
		.await
		.unwrap_err();
	assert!(matches!(err, NearconfError::Loader(_)));
}

#[tokio::test]
async fn test_sync_only_loader_in_async_pipeline_is_error() {
	let tree = Tree::new();
	tree.write("conf.yaml", "a: 1\n");
	let calls = Arc::new(AtomicUsize::new(0));

	let mut locator = tree.locator();
	locator.register_loader(counting_loader("yaml", r"\.yaml$", &calls));

	let err = locator
		.load_async((["conf.yaml"], tree.root()))
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		NearconfError::UnsupportedLoadMode { mode: "async", .. }
	));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}
