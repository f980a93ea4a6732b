//! Tests for FileBackend
//!
//! These tests verify:
//! - Missing files load as an empty snapshot
//! - Corrupt files are reported, never treated as empty
//! - Save/load keeps records and the id high-water mark
//! - The on-disk layout is a plain JSON array of flat objects
//! - A failed save leaves the previous snapshot intact

use std::fs;
use std::path::PathBuf;

use rosterdb::backend::{Backend, Change, Durability};
use rosterdb::config::{Config, SyncStrategy};
use rosterdb::record::fields;
use rosterdb::{FileBackend, Record, RecordId, RosterError, Snapshot};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_snapshot() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("users.json");
    (temp_dir, path)
}

fn record(id: u64, first: &str) -> Record {
    Record::new(
        RecordId::new(id),
        fields([("first_name", first), ("email", "x@example.com")]),
    )
}

fn open(path: &PathBuf) -> FileBackend {
    FileBackend::open(path, SyncStrategy::Always, true).unwrap()
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    let snapshot = backend.load().unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.last_id(), RecordId::ZERO);
    assert!(!path.exists());
}

#[test]
fn test_load_corrupt_file_is_unavailable() {
    let (_temp, path) = setup_temp_snapshot();
    fs::write(&path, b"{ not json").unwrap();
    let backend = open(&path);

    let err = backend.load().unwrap_err();
    assert!(matches!(err, RosterError::BackendUnavailable(_)));
}

#[test]
fn test_load_empty_file_is_unavailable() {
    let (_temp, path) = setup_temp_snapshot();
    fs::write(&path, b"").unwrap();
    let backend = open(&path);

    assert!(matches!(
        backend.load().unwrap_err(),
        RosterError::BackendUnavailable(_)
    ));
}

#[test]
fn test_load_duplicate_ids_is_unavailable() {
    let (_temp, path) = setup_temp_snapshot();
    fs::write(&path, br#"[{"id": 1, "a": "x"}, {"id": 1, "a": "y"}]"#).unwrap();
    let backend = open(&path);

    assert!(matches!(
        backend.load().unwrap_err(),
        RosterError::BackendUnavailable(_)
    ));
}

#[test]
fn test_load_record_without_id_is_unavailable() {
    let (_temp, path) = setup_temp_snapshot();
    fs::write(&path, br#"[{"first_name": "Ann"}]"#).unwrap();
    let backend = open(&path);

    assert!(matches!(
        backend.load().unwrap_err(),
        RosterError::BackendUnavailable(_)
    ));
}

#[test]
fn test_load_corrupt_id_file_is_unavailable() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);
    fs::write(backend.ids_path(), b"garbage").unwrap();

    assert!(matches!(
        backend.load().unwrap_err(),
        RosterError::BackendUnavailable(_)
    ));
}

// =============================================================================
// Save Tests
// =============================================================================

#[test]
fn test_save_then_load() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    let snapshot = Snapshot::new(vec![record(1, "Ann"), record(3, "Cid")], RecordId::new(5));
    backend.save(&snapshot).unwrap();

    let loaded = open(&path).load().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.last_id(), RecordId::new(5));
}

#[test]
fn test_save_writes_flat_json_array() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    backend
        .save(&Snapshot::new(vec![record(1, "Ann")], RecordId::new(1)))
        .unwrap();

    let on_disk: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        on_disk,
        json!([{ "id": 1, "first_name": "Ann", "email": "x@example.com" }])
    );

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  {"), "expected two-space indentation");
}

#[test]
fn test_save_compact_when_not_pretty() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = FileBackend::open(&path, SyncStrategy::Never, false).unwrap();

    backend
        .save(&Snapshot::new(vec![record(1, "Ann")], RecordId::new(1)))
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains('\n'));
}

#[test]
fn test_save_replaces_whole_file() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    backend
        .save(&Snapshot::new(vec![record(1, "Ann"), record(2, "Ben")], RecordId::new(2)))
        .unwrap();
    backend
        .save(&Snapshot::new(vec![record(2, "Ben")], RecordId::new(2)))
        .unwrap();

    let loaded = backend.load().unwrap();
    assert_eq!(loaded.records(), &[record(2, "Ben")]);
}

#[test]
fn test_save_leaves_no_temp_files() {
    let (temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    for i in 1..=5 {
        let records = (1..=i).map(|n| record(n, "x")).collect();
        backend.save(&Snapshot::new(records, RecordId::new(i))).unwrap();
    }

    let mut names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["users.json", "users.json.ids"]);
}

#[test]
fn test_failed_save_keeps_previous_snapshot() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);

    let original = Snapshot::new(vec![record(1, "Ann")], RecordId::new(1));
    backend.save(&original).unwrap();

    // A directory where the id file should go makes the rename fail
    fs::remove_file(backend.ids_path()).unwrap();
    fs::create_dir(backend.ids_path()).unwrap();

    let next = Snapshot::new(vec![record(1, "Ann"), record(2, "Ben")], RecordId::new(2));
    let err = backend.save(&next).unwrap_err();
    assert!(matches!(err, RosterError::BackendWriteFailed(_)));

    let on_disk: Vec<Record> = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, original.records());
}

#[test]
fn test_commit_saves_staged_snapshot() {
    let (_temp, path) = setup_temp_snapshot();
    let backend = open(&path);
    assert_eq!(backend.durability(), Durability::WholeSnapshot);

    let ann = record(1, "Ann");
    let staged = Snapshot::new(vec![ann.clone()], RecordId::new(1));
    backend
        .commit(&Change::Create(&ann), RecordId::new(1), &|| staged.clone())
        .unwrap();

    assert_eq!(backend.load().unwrap(), staged);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_from_config_uses_snapshot_path() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path().join("nested"))
        .snapshot_file("people.json")
        .build();

    let backend = FileBackend::from_config(&config).unwrap();

    assert_eq!(backend.path(), temp_dir.path().join("nested").join("people.json"));
    assert_eq!(
        backend.ids_path(),
        temp_dir.path().join("nested").join("people.json.ids")
    );
    assert!(temp_dir.path().join("nested").is_dir());
}
