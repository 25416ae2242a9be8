//! Persistence across engine restarts and config-driven storage.

mod common;

use common::Harness;
use std::sync::Arc;
use tabstree::host::SimulatedHost;
use tabstree::persistence::{FileKv, PersistenceAdapter};
use tabstree::{Collection, EngineOptions, Forest};
use tabstree_config::Config;
use tempfile::TempDir;

#[tokio::test]
async fn test_forest_survives_restart() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let host = Arc::new(SimulatedHost::new());

    let first = Harness::with_host(
        host.clone(),
        Box::new(FileKv::new(temp.path())),
        EngineOptions::default(),
    );
    first.open_root(1, 1).await;
    first.open_child(2, 1, 1).await;
    first.open_root(3, 2).await;
    let before = first.engine.snapshot().await;
    drop(first);

    let second = Harness::with_host(
        host,
        Box::new(FileKv::new(temp.path())),
        EngineOptions::default(),
    );
    assert_eq!(second.engine.snapshot().await, before);
    assert_eq!(second.pairs(1).await, vec![(1, None), (2, Some(1))]);

    second.engine.reset().await.unwrap();
    assert!(second.engine.snapshot().await.is_empty());
}

#[test]
fn test_roundtrip_shapes() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let adapter = PersistenceAdapter::new(Box::new(FileKv::new(temp.path())), "tabstruct");

    let empty = Collection::new();
    adapter.save(&empty).unwrap();
    assert_eq!(adapter.load(), empty);

    let mut many = Collection::new();
    many.insert(9, Forest::from_pairs([(4, None), (2, Some(4)), (8, Some(2))]));
    many.insert(1, Forest::new());
    many.insert(5, Forest::from_pairs([(6, None), (7, None)]));
    adapter.save(&many).unwrap();

    let loaded = adapter.load();
    assert_eq!(loaded, many);
    assert_eq!(loaded.windows().collect::<Vec<_>>(), vec![9, 1, 5]);
}

#[test]
fn test_corrupt_file_loads_empty() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(temp.path().join("tabstruct.json"), b"[[1, [[2, ").unwrap();

    let adapter = PersistenceAdapter::new(Box::new(FileKv::new(temp.path())), "tabstruct");
    assert!(adapter.load().is_empty());
}

#[tokio::test]
async fn test_config_drives_storage_and_options() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            "storage_dir: {}\nstorage_key: tree\nrevalidate_move_chunk: false\npanel_url: about:panel\n",
            temp.path().join("state").display()
        ),
    )
    .unwrap();

    let config = Config::load_from(&config_path).unwrap();
    let options = EngineOptions::from(&config);
    assert!(!options.revalidate_move_chunk);
    assert_eq!(options.panel_url.as_deref(), Some("about:panel"));

    let h = Harness::with_options(options);
    h.open_root(1, 1).await;
    assert_eq!(h.tabs(1).await, vec![1]);

    let adapter = PersistenceAdapter::new(Box::new(FileKv::new(config.storage_dir())), &config.storage_key);
    adapter.save(&h.engine.snapshot().await).unwrap();
    assert!(temp.path().join("state").join("tree.json").exists());
}
