// Store Tests
// Opening, reopening and locking of the sled-backed CLI store

use ledgerctl::storage::{trees, CliStore, StoreError};
use ledgerctl::types::ErrorKind;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_store_open_new() {
    let temp_dir = TempDir::new().unwrap();
    let store = CliStore::open(temp_dir.path()).unwrap();

    assert!(store.tree(trees::ALIASES).unwrap().is_empty());
}

#[test]
fn test_store_open_existing() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = CliStore::open(temp_dir.path()).unwrap();
        store
            .tree(trees::OPERATORS)
            .unwrap()
            .insert("testnet", b"value".as_slice())
            .unwrap();
        store.flush().unwrap();
    }

    let store = CliStore::open(temp_dir.path()).unwrap();
    let value = store.tree(trees::OPERATORS).unwrap().get("testnet").unwrap();
    assert_eq!(value.map(|v| v.to_vec()), Some(b"value".to_vec()));
}

#[test]
fn test_trees_are_isolated() {
    let store = CliStore::temporary().unwrap();

    store
        .tree(trees::KEY_MATERIAL_PLAINTEXT)
        .unwrap()
        .insert("kr_1", b"x".as_slice())
        .unwrap();

    assert!(store.tree(trees::KEY_MATERIAL_ENCRYPTED).unwrap().get("kr_1").unwrap().is_none());
    assert!(store.tree(trees::KEY_RECORDS).unwrap().is_empty());
}

#[test]
fn test_stats_counts_trees() {
    let store = CliStore::temporary().unwrap();
    let before = store.stats().unwrap().tree_count;

    store.tree(trees::ALIASES).unwrap();
    store.tree(trees::ALIAS_NAMES).unwrap();

    assert_eq!(store.stats().unwrap().tree_count, before + 2);
}

#[test]
fn test_second_open_reports_locked() {
    let temp_dir = TempDir::new().unwrap();
    let _held = CliStore::open(temp_dir.path()).unwrap();

    let started = Instant::now();
    let err = CliStore::open_with_timeout(temp_dir.path(), Duration::from_millis(150))
        .err()
        .unwrap();

    assert!(matches!(err, StoreError::Locked(_)), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[test]
fn test_open_waits_for_lock_release() {
    let temp_dir = TempDir::new().unwrap();
    let held = CliStore::open(temp_dir.path()).unwrap();

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        drop(held);
    });

    let store = CliStore::open_with_timeout(temp_dir.path(), Duration::from_secs(5));
    releaser.join().unwrap();

    assert!(store.is_ok());
}
