//! Tests for DocumentBackend
//!
//! These tests verify:
//! - Per-record commits for create/update/delete
//! - Whole-collection save in one transaction
//! - The id counter survives deleting the newest record
//! - Missing documents fail the commit

use rosterdb::backend::{Backend, Change, Durability};
use rosterdb::config::SyncStrategy;
use rosterdb::record::fields;
use rosterdb::{DocumentBackend, Record, RecordId, RosterError, Snapshot};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(id: u64, first: &str) -> Record {
    Record::new(RecordId::new(id), fields([("first_name", first)]))
}

fn test_backend() -> DocumentBackend {
    DocumentBackend::open_in_memory().unwrap()
}

/// Per-record commit; fails the test if the whole collection gets built
fn commit(backend: &DocumentBackend, change: Change<'_>, last_id: u64) -> rosterdb::Result<()> {
    backend.commit(&change, RecordId::new(last_id), &|| -> Snapshot {
        panic!("document commit built the whole collection")
    })
}

// =============================================================================
// Basic Tests
// =============================================================================

#[test]
fn test_open_in_memory_is_empty() {
    let backend = test_backend();

    assert_eq!(backend.durability(), Durability::PerRecord);
    assert_eq!(backend.path(), None);

    let snapshot = backend.load().unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.last_id(), RecordId::ZERO);
}

#[test]
fn test_commit_create_update_delete() {
    let backend = test_backend();

    let ann = record(1, "Ann");
    commit(&backend, Change::Create(&ann), 1).unwrap();
    assert_eq!(backend.document_count().unwrap(), 1);

    let renamed = Record::new(RecordId::new(1), fields([("first_name", "Anna")]));
    commit(
        &backend,
        Change::Update {
            before: &ann,
            after: &renamed,
        },
        1,
    )
    .unwrap();

    let loaded = backend.load().unwrap();
    assert_eq!(loaded.records(), &[renamed.clone()]);
    assert_eq!(loaded.records()[0].field("first_name"), Some(&json!("Anna")));

    commit(&backend, Change::Delete(&renamed), 1).unwrap();
    assert_eq!(backend.document_count().unwrap(), 0);
}

#[test]
fn test_counter_survives_delete_of_newest() {
    let backend = test_backend();

    let ann = record(1, "Ann");
    let ben = record(2, "Ben");
    commit(&backend, Change::Create(&ann), 1).unwrap();
    commit(&backend, Change::Create(&ben), 2).unwrap();
    commit(&backend, Change::Delete(&ben), 2).unwrap();

    let loaded = backend.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.last_id(), RecordId::new(2));
}

#[test]
fn test_counter_never_decreases() {
    let backend = test_backend();

    backend.save(&Snapshot::new(vec![], RecordId::new(10))).unwrap();
    backend.save(&Snapshot::new(vec![], RecordId::new(3))).unwrap();

    assert_eq!(backend.load().unwrap().last_id(), RecordId::new(10));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_update_missing_document_fails() {
    let backend = test_backend();
    let ghost = record(9, "Ghost");

    let err = commit(
        &backend,
        Change::Update {
            before: &ghost,
            after: &ghost,
        },
        9,
    )
    .unwrap_err();
    assert!(matches!(err, RosterError::BackendWriteFailed(_)));

    // The failed transaction must not have bumped the counter either
    assert_eq!(backend.load().unwrap().last_id(), RecordId::ZERO);
}

#[test]
fn test_delete_missing_document_fails() {
    let backend = test_backend();
    let ghost = record(4, "Ghost");

    let err = commit(&backend, Change::Delete(&ghost), 4).unwrap_err();
    assert!(matches!(err, RosterError::BackendWriteFailed(_)));
}

#[test]
fn test_create_duplicate_id_fails() {
    let backend = test_backend();
    let ann = record(1, "Ann");

    commit(&backend, Change::Create(&ann), 1).unwrap();
    let err = commit(&backend, Change::Create(&ann), 1).unwrap_err();

    assert!(matches!(err, RosterError::BackendWriteFailed(_)));
    assert_eq!(backend.document_count().unwrap(), 1);
}

// =============================================================================
// Save / Persistence Tests
// =============================================================================

#[test]
fn test_save_replaces_all_documents() {
    let backend = test_backend();

    backend
        .save(&Snapshot::new(vec![record(1, "Ann"), record(2, "Ben")], RecordId::new(2)))
        .unwrap();
    backend
        .save(&Snapshot::new(vec![record(3, "Cid")], RecordId::new(3)))
        .unwrap();

    let loaded = backend.load().unwrap();
    assert_eq!(loaded.records(), &[record(3, "Cid")]);
    assert_eq!(loaded.last_id(), RecordId::new(3));
}

#[test]
fn test_open_file_based() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("users.db");

    {
        let backend = DocumentBackend::open(&db_path, SyncStrategy::Always).unwrap();
        backend
            .save(&Snapshot::new(vec![record(1, "Ann")], RecordId::new(1)))
            .unwrap();
    }

    // Reopen and verify data persisted
    let backend = DocumentBackend::open(&db_path, SyncStrategy::Always).unwrap();
    assert_eq!(backend.path(), Some(db_path.as_path()));
    assert_eq!(backend.load().unwrap().records(), &[record(1, "Ann")]);
}

#[test]
fn test_open_unreachable_path_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("missing").join("users.db");

    let err = DocumentBackend::open(&db_path, SyncStrategy::Always).err().unwrap();
    assert!(matches!(err, RosterError::BackendUnavailable(_)));
}
