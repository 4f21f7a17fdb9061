//! Collection error-message, atomic-write-safety, init and file store
//! integration tests. Storage: ~/.spansync/collection.yaml

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use spansync_core::{
    collection, FileStore, RecordId, RecordStore, SearchQuery, Sid, StoreError, TypeName,
};
use std::fs;

fn basic() -> TypeName {
    TypeName::from("Basic")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_collection_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = collection::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::CollectionNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("collection not found"));
    assert!(err.to_string().contains("collection.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".spansync/collection.yaml")
        .write_binary(b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = collection::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("collection.yaml"), "must contain file path, got: {msg}");
    let source_msg = match &err {
        StoreError::Parse { source, .. } => source.to_string(),
        _ => unreachable!(),
    };
    assert!(!source_msg.is_empty(), "serde_yaml must provide error context");
}

#[test]
fn load_wrong_type_yaml_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".spansync/collection.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = collection::load_at(home.path()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    collection::init_at(home.path()).expect("init");

    let yaml_path = collection::collection_path_at(home.path());
    let original_bytes = fs::read(&yaml_path).expect("read original");

    // .tmp written but the process died before rename
    let tmp = yaml_path.with_file_name("collection.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    let current_bytes = fs::read(&yaml_path).expect("read after crash");
    assert_eq!(original_bytes, current_bytes, "original must be unchanged after crash");
    assert!(collection::load_at(home.path()).is_ok());
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_collection_and_templates_dir() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let created = collection::init_at(home.path()).expect("init");

    home.child(".spansync/collection.yaml")
        .assert(predicate::path::exists());
    home.child(".spansync/templates")
        .assert(predicate::path::is_dir());

    let names: Vec<_> = created.record_types.iter().map(|t| t.name.0.as_str()).collect();
    assert_eq!(names, vec!["Basic", "Cloze"]);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = collection::collection_path_at(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn init_keeps_existing_records() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    collection::init_at(home.path()).expect("init");
    let mut store = FileStore::open_at(home.path()).expect("open");
    store.add(&basic(), ["kept"]).expect("add");

    let again = collection::init_at(home.path()).expect("second init");
    assert_eq!(again.records.len(), 1);
    assert_eq!(again.records[0].fields[0], "kept");
}

// ---------------------------------------------------------------------------
// 4. File store
// ---------------------------------------------------------------------------

#[test]
fn file_store_ids_survive_reopen() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    collection::init_at(home.path()).expect("init");

    let mut store = FileStore::open_at(home.path()).expect("open");
    assert_eq!(store.add(&basic(), ["a"]).expect("add"), RecordId(1));
    drop(store);

    let mut store = FileStore::open_at(home.path()).expect("reopen");
    assert_eq!(store.add(&basic(), ["b"]).expect("add"), RecordId(2));
}

#[test]
fn file_store_find_sees_persisted_markers() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    collection::init_at(home.path()).expect("init");

    let mut store = FileStore::open_at(home.path()).expect("open");
    let id = store
        .add(&basic(), [r#"x <span class="sync" sid="5_0_0042">y</span>"#])
        .expect("add");
    drop(store);

    let store = FileStore::open_at(home.path()).expect("reopen");
    let found = store
        .find(&SearchQuery::PeerMarkers(Sid::from("5_0_0042")))
        .expect("find");
    assert_eq!(found, vec![id]);
}
