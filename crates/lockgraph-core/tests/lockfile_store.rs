use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;

use lockgraph_core::catalog::{CatalogError, CatalogFactory, RegistryCatalog, UrlCatalogFactory};
use lockgraph_core::config::LockConfig;
use lockgraph_core::lockfile::{LockedGraph, LockedPackage, LockfileStore, PackageOrigin};

const LOCKFILE: &str = "\
GEM
  remote: https://one.example/
  remote: https://two.example/
  remote: https://three.example/
  specs:
    rack (3.0.8)

PLATFORMS
  ruby

DEPENDENCIES
  rack
";

/// Factory that records how many constructions overlap.
#[derive(Default)]
struct CountingFactory {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl CatalogFactory for CountingFactory {
    fn make_catalog(&self, location: &str) -> Result<RegistryCatalog, CatalogError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        let result = UrlCatalogFactory.make_catalog(location);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[test]
fn load_missing_returns_empty_graph() {
    let temp = TempDir::new().unwrap();
    let store = LockfileStore::new(temp.path().join("Gemfile.lock"));

    let loaded = store.load().unwrap();

    assert!(!store.exists());
    assert!(loaded.graph.is_empty());
    assert!(loaded.diagnostics.is_empty());
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = LockfileStore::new(temp.path().join("nested").join("Gemfile.lock"));

    let mut graph = LockedGraph::new();
    graph
        .registry_remotes
        .insert("https://rubygems.org/".to_string());
    graph
        .add_package(LockedPackage::new("rake", "13.0.6", PackageOrigin::Registry))
        .unwrap();
    graph.dependencies.push("rake".to_string());

    store.save(&graph, &LockConfig::default()).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.graph, graph);
    assert_eq!(
        std::fs::read_to_string(store.path()).unwrap(),
        graph.dump()
    );
}

#[test]
fn malformed_lockfile_reports_path_and_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Gemfile.lock");
    std::fs::write(&path, "GEM\n  specs:\n    rack 3.0.8\n").unwrap();

    let err = LockfileStore::new(&path).load().unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.contains("Failed to parse lockfile"));
    assert!(message.contains("line 3"));
    assert!(message.contains("rack 3.0.8"));
}

#[test]
fn load_with_catalogs_builds_one_handle_per_remote() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Gemfile.lock");
    std::fs::write(&path, LOCKFILE).unwrap();

    let config = LockConfig {
        catalog_workers: 2,
        ..LockConfig::default()
    };
    let factory = Arc::new(CountingFactory::default());
    let loaded = LockfileStore::new(&path)
        .load_with_catalogs(&config, factory.clone())
        .unwrap();

    let catalogs = loaded.graph.server_catalogs();
    assert_eq!(catalogs.len(), 3);
    assert!(catalogs.iter().all(|(_, slot)| slot.is_ok()));
    assert_eq!(factory.calls.load(Ordering::SeqCst), 3);
    assert!(factory.peak.load(Ordering::SeqCst) <= 2);

    let one = loaded
        .graph
        .server_catalog("https://one.example/")
        .unwrap()
        .as_ref()
        .unwrap();
    assert_eq!(one.location().as_str(), "https://one.example/");
}

#[test]
fn catalog_failure_is_attributed_to_its_remote() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Gemfile.lock");
    std::fs::write(
        &path,
        "GEM\n  remote: https://rubygems.org/\n  remote: gems-mirror\n  specs:\n    rack (3.0.8)\n",
    )
    .unwrap();

    let loaded = LockfileStore::new(&path)
        .load_with_catalogs(&LockConfig::default(), Arc::new(UrlCatalogFactory))
        .unwrap();

    assert_eq!(loaded.graph.package_count(), 1);
    assert!(
        loaded
            .graph
            .server_catalog("https://rubygems.org/")
            .unwrap()
            .is_ok()
    );
    let err = loaded
        .graph
        .server_catalog("gems-mirror")
        .unwrap()
        .as_ref()
        .unwrap_err();
    assert_eq!(err.remote, "gems-mirror");
}
