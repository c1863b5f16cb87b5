//! Store Invariant Tests
//!
//! Tests for the store's core contract:
//! - Primary keys are unique among live records at all times
//! - create followed by get round-trips the record
//! - count always equals the length of get_all
//! - Deleted keys are distinguished from never-issued keys
//! - The primary key is immutable once assigned
//! - Every failure surfaces exactly one kind from the closed taxonomy

use mockstore::resource::{FieldDef, KeyPolicy, Resource};
use mockstore::store::{Record, Store, StoreErrorKind, STORE_ERROR_DOMAIN};
use serde_json::{json, Value};
use std::collections::HashSet;

// =============================================================================
// Helper Functions
// =============================================================================

fn props(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn users_store() -> Store {
    let store = Store::new();
    store
        .add_resource(Resource::new(
            "users",
            vec![FieldDef::string("name"), FieldDef::number("age")],
        ))
        .unwrap();
    store
}

// =============================================================================
// Round Trip Tests
// =============================================================================

/// create followed by get with the returned key yields an equal record.
#[test]
fn test_create_get_roundtrip() {
    let store = users_store();

    let created = store
        .create("users", props(json!({"name": "Alice", "age": 30})))
        .unwrap();
    assert_eq!(created["id"], json!(1));

    let fetched = store.get("users", &created["id"]).unwrap();
    assert_eq!(created, fetched);
}

/// Generated keys are unique among all live records.
#[test]
fn test_generated_keys_unique() {
    let store = users_store();

    let mut keys = HashSet::new();
    for i in 0..50 {
        let record = store
            .create("users", props(json!({"name": format!("user-{}", i)})))
            .unwrap();
        assert!(keys.insert(record["id"].to_string()));
    }
    assert_eq!(store.count("users").unwrap(), 50);
}

/// String and number renderings of a key address the same record.
#[test]
fn test_key_canonicalization() {
    let store = users_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let by_number = store.get("users", &json!(1)).unwrap();
    let by_string = store.get("users", &json!("1")).unwrap();
    assert_eq!(by_number, by_string);
}

// =============================================================================
// Count Tests
// =============================================================================

/// count equals the length of get_all through creates and deletes.
#[test]
fn test_count_matches_get_all() {
    let store = users_store();
    assert_eq!(store.count("users").unwrap(), 0);
    assert_eq!(store.get_all("users").unwrap().len(), 0);

    for i in 0..10 {
        store
            .create("users", props(json!({"name": format!("user-{}", i)})))
            .unwrap();
        assert_eq!(
            store.count("users").unwrap(),
            store.get_all("users").unwrap().len()
        );
    }

    store.delete("users", &json!(3)).unwrap();
    store.delete("users", &json!(7)).unwrap();
    assert_eq!(store.count("users").unwrap(), 8);
    assert_eq!(store.get_all("users").unwrap().len(), 8);
}

/// get_all returns records in insertion order.
#[test]
fn test_get_all_insertion_order() {
    let store = users_store();
    for i in 0..5 {
        store
            .create("users", props(json!({"name": format!("user-{}", i)})))
            .unwrap();
    }

    let ids: Vec<u64> = store
        .get_all("users")
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

// =============================================================================
// Tombstone Tests
// =============================================================================

/// delete then get reports already-deleted; a never-issued key reports
/// not-found.
#[test]
fn test_deleted_vs_never_issued() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    store.delete("users", &user["id"]).unwrap();

    let err = store.get("users", &user["id"]).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectAlreadyDeleted);

    let err = store.get("users", &json!(99)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);
}

/// A second delete of the same key never succeeds.
#[test]
fn test_double_delete() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    store.delete("users", &user["id"]).unwrap();

    let err = store.delete("users", &user["id"]).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectAlreadyDeleted);

    let err = store.delete("users", &json!(99)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);
}

/// modify on a deleted key reports already-deleted.
#[test]
fn test_modify_deleted_record() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    store.delete("users", &user["id"]).unwrap();

    let err = store
        .modify("users", &user["id"], props(json!({"name": "Alma"})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectAlreadyDeleted);
}

// =============================================================================
// Modify Tests
// =============================================================================

/// modify merges the supplied properties over the record; untouched fields
/// survive.
#[test]
fn test_modify_is_partial_merge() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice", "age": 30})))
        .unwrap();

    let updated = store
        .modify("users", &user["id"], props(json!({"age": 31})))
        .unwrap();

    assert_eq!(updated["name"], json!("Alice"));
    assert_eq!(updated["age"], json!(31));
    assert_eq!(updated, store.get("users", &user["id"]).unwrap());
}

/// A differing primary key in the properties is rejected and the record is
/// unchanged.
#[test]
fn test_primary_key_is_immutable() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let err = store
        .modify("users", &user["id"], props(json!({"id": 2, "name": "Eve"})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);

    let unchanged = store.get("users", &user["id"]).unwrap();
    assert_eq!(unchanged["name"], json!("Alice"));
}

/// Re-supplying the same key in the properties is allowed.
#[test]
fn test_modify_with_matching_key() {
    let store = users_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let updated = store
        .modify(
            "users",
            &user["id"],
            props(json!({"id": 1, "name": "Alma"})),
        )
        .unwrap();
    assert_eq!(updated["name"], json!("Alma"));
    assert_eq!(updated["id"], json!(1));
}

/// modify on a never-issued key reports not-found.
#[test]
fn test_modify_missing_record() {
    let store = users_store();
    let err = store
        .modify("users", &json!(1), props(json!({"name": "Ghost"})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);
}

// =============================================================================
// Bad Request Tests
// =============================================================================

/// Keys must be strings or numbers.
#[test]
fn test_non_scalar_key_rejected() {
    let store = users_store();
    for bad_key in [json!(true), json!(null), json!([1]), json!({"id": 1})] {
        let err = store.get("users", &bad_key).unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::BadRequest);
    }
}

/// Caller-supplied key collisions are rejected without losing the original.
#[test]
fn test_supplied_key_collision() {
    let store = Store::new();
    store
        .add_resource(
            Resource::new("tags", vec![FieldDef::string("label")])
                .with_key_policy(KeyPolicy::CallerSupplied),
        )
        .unwrap();

    store
        .create("tags", props(json!({"id": "rust", "label": "original"})))
        .unwrap();
    let err = store
        .create("tags", props(json!({"id": "rust", "label": "usurper"})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);

    assert_eq!(
        store.get("tags", &json!("rust")).unwrap()["label"],
        json!("original")
    );
}

// =============================================================================
// Resource Lifecycle Tests
// =============================================================================

/// Dropping a resource discards its records; later operations report the
/// resource as missing.
#[test]
fn test_drop_resource_discards_records() {
    let store = users_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    store.drop_resource("users").unwrap();

    let err = store.count("users").unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);
    let err = store.get("users", &json!(1)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);
}

/// No record outlives its resource: re-registering starts empty with fresh
/// keys.
#[test]
fn test_reregistered_resource_starts_fresh() {
    let store = users_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    store.drop_resource("users").unwrap();

    store
        .add_resource(Resource::new("users", vec![FieldDef::string("name")]))
        .unwrap();
    assert_eq!(store.count("users").unwrap(), 0);

    let user = store.create("users", props(json!({"name": "Bob"}))).unwrap();
    assert_eq!(user["id"], json!(1));
}

// =============================================================================
// Error Shape Tests
// =============================================================================

/// Errors carry the (domain, code, message) triple for protocol mapping.
#[test]
fn test_error_triple() {
    let store = users_store();
    let err = store.get("users", &json!(1)).unwrap_err();

    assert_eq!(err.domain(), STORE_ERROR_DOMAIN);
    assert_eq!(err.kind().code(), "STORE_OBJECT_NOT_FOUND");
    assert_eq!(err.kind().numeric_code(), 2);
    assert!(err.message().contains("users"));
}
