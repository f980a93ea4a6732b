//! Tests for Handler
//!
//! These tests verify:
//! - Commands map onto store operations and response statuses
//! - Required-field and scalar validation
//! - Store errors surface as the matching client status

use std::sync::Arc;

use rosterdb::protocol::{Command, Status};
use rosterdb::record::fields;
use rosterdb::{Config, Fields, Handler, MemoryBackend, Record, RecordId, RecordStore};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_handler() -> (Arc<MemoryBackend>, Handler) {
    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(RecordStore::with_backend(backend.clone()).unwrap());
    (backend, Handler::from_config(store, &Config::default()))
}

fn full_person(first: &str) -> Fields {
    fields([
        ("first_name", first),
        ("last_name", "Lee"),
        ("email", "lee@example.com"),
        ("gender", "Male"),
    ])
}

// =============================================================================
// Routing Tests
// =============================================================================

#[test]
fn test_handle_ping() {
    let (_backend, handler) = setup_handler();

    let response = handler.handle(Command::Ping);
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.body::<String>().unwrap(), "PONG");
}

#[test]
fn test_handle_create_returns_created_record() {
    let (_backend, handler) = setup_handler();

    let response = handler.handle(Command::Create {
        fields: full_person("Ann"),
    });

    assert_eq!(response.status, Status::Created);
    let record: Record = response.body().unwrap();
    assert_eq!(record.id(), RecordId::new(1));
    assert_eq!(record.field("first_name"), Some(&json!("Ann")));
}

#[test]
fn test_handle_list_and_get() {
    let (_backend, handler) = setup_handler();
    handler.handle(Command::Create { fields: full_person("Ann") });
    handler.handle(Command::Create { fields: full_person("Ben") });

    let listed: Vec<Record> = handler.handle(Command::List).body().unwrap();
    assert_eq!(listed.len(), 2);

    let response = handler.handle(Command::Get { id: RecordId::new(2) });
    assert_eq!(response.status, Status::Ok);
    let record: Record = response.body().unwrap();
    assert_eq!(record.field("first_name"), Some(&json!("Ben")));
}

#[test]
fn test_handle_get_missing() {
    let (_backend, handler) = setup_handler();

    let response = handler.handle(Command::Get { id: RecordId::new(9) });
    assert_eq!(response.status, Status::NotFound);
    assert!(response.error_message().unwrap().contains('9'));
}

#[test]
fn test_handle_update_merges() {
    let (_backend, handler) = setup_handler();
    handler.handle(Command::Create { fields: full_person("Ann") });

    let response = handler.handle(Command::Update {
        id: RecordId::new(1),
        fields: fields([("last_name", "Changed")]),
    });

    assert_eq!(response.status, Status::Ok);
    let record: Record = response.body().unwrap();
    assert_eq!(record.field("last_name"), Some(&json!("Changed")));
    assert_eq!(record.field("email"), Some(&json!("lee@example.com")));
}

#[test]
fn test_handle_delete() {
    let (_backend, handler) = setup_handler();
    handler.handle(Command::Create { fields: full_person("Ann") });

    let response = handler.handle(Command::Delete { id: RecordId::new(1) });
    assert_eq!(response.status, Status::Ok);

    let again = handler.handle(Command::Delete { id: RecordId::new(1) });
    assert_eq!(again.status, Status::NotFound);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_create_missing_fields_rejected() {
    let (backend, handler) = setup_handler();

    let response = handler.handle(Command::Create {
        fields: fields([("first_name", "Ann"), ("email", "")]),
    });

    assert_eq!(response.status, Status::BadRequest);
    let message = response.error_message().unwrap();
    assert!(message.contains("last_name"));
    assert!(message.contains("email"));
    assert!(message.contains("gender"));
    assert!(!message.contains("first_name"));
    assert_eq!(backend.save_count(), 0);
}

#[test]
fn test_create_non_string_required_field_rejected() {
    let (_backend, handler) = setup_handler();
    let mut input = full_person("Ann");
    input.insert("gender".to_string(), json!(1));

    let response = handler.handle(Command::Create { fields: input });
    assert_eq!(response.status, Status::BadRequest);
}

#[test]
fn test_create_nested_value_rejected() {
    let (_backend, handler) = setup_handler();
    let mut input = full_person("Ann");
    input.insert("tags".to_string(), json!(["a", "b"]));

    let response = handler.handle(Command::Create { fields: input });
    assert_eq!(response.status, Status::BadRequest);
}

#[test]
fn test_custom_required_fields() {
    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(RecordStore::with_backend(backend).unwrap());
    let handler = Handler::new(store, vec!["title".to_string()]);

    let ok = handler.handle(Command::Create {
        fields: fields([("title", "Task")]),
    });
    assert_eq!(ok.status, Status::Created);

    let rejected = handler.handle(Command::Create {
        fields: fields([("first_name", "Ann")]),
    });
    assert_eq!(rejected.status, Status::BadRequest);
}

#[test]
fn test_update_with_only_id_rejected() {
    let (_backend, handler) = setup_handler();
    handler.handle(Command::Create { fields: full_person("Ann") });

    let response = handler.handle(Command::Update {
        id: RecordId::new(1),
        fields: fields([("id", json!(5))]),
    });
    assert_eq!(response.status, Status::BadRequest);
}

#[test]
fn test_update_id_field_ignored() {
    let (_backend, handler) = setup_handler();
    handler.handle(Command::Create { fields: full_person("Ann") });

    let response = handler.handle(Command::Update {
        id: RecordId::new(1),
        fields: fields([("id", json!(5)), ("gender", json!("Female"))]),
    });

    let record: Value = response.body().unwrap();
    assert_eq!(record["id"], json!(1));
    assert_eq!(record["gender"], json!("Female"));
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[test]
fn test_persistence_failure_is_server_error() {
    let (backend, handler) = setup_handler();
    backend.set_fail_writes(true);

    let response = handler.handle(Command::Create {
        fields: full_person("Ann"),
    });
    assert_eq!(response.status, Status::Error);

    let listed: Vec<Record> = handler.handle(Command::List).body().unwrap();
    assert!(listed.is_empty());
}
