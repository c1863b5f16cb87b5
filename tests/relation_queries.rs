//! Parent/Child Relationship Tests
//!
//! Tests for nested-route navigation:
//! - Children are enumerated by parent key in insertion order
//! - A live parent with no children yields an empty result, not an error
//! - Foreign keys must reference a live parent record at write time
//! - Undeclared relationships and dead parents are rejected with distinct
//!   error kinds

use mockstore::resource::{FieldDef, Resource};
use mockstore::store::{Record, Store, StoreErrorKind};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn props(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// users (key id) and posts (key id, parent users via user_id)
fn blog_store() -> Store {
    let store = Store::new();
    store
        .add_resource(Resource::new("users", vec![FieldDef::string("name")]))
        .unwrap();
    store
        .add_resource(
            Resource::new("posts", vec![FieldDef::string("title")])
                .with_parent("users", "user_id"),
        )
        .unwrap();
    store
}

// =============================================================================
// Nested Route Scenario
// =============================================================================

/// The canonical flow: create a user, attach a post, enumerate, delete,
/// re-read.
#[test]
fn test_users_posts_scenario() {
    let store = blog_store();

    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    assert_eq!(user["id"], json!(1));

    let post = store
        .create(
            "posts",
            props(json!({"title": "First post", "user_id": 1})),
        )
        .unwrap();

    let children = store.get_children("posts", "users", &json!(1)).unwrap();
    assert_eq!(children, vec![post.clone()]);

    store.delete("posts", &post["id"]).unwrap();
    let children = store.get_children("posts", "users", &json!(1)).unwrap();
    assert!(children.is_empty());

    let err = store.get("posts", &post["id"]).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectAlreadyDeleted);
}

/// Children come back in insertion order, interleaved parents untangled.
#[test]
fn test_children_insertion_order() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    store.create("users", props(json!({"name": "Bob"}))).unwrap();

    for (title, user_id) in [
        ("a-1", 1),
        ("b-1", 2),
        ("a-2", 1),
        ("b-2", 2),
        ("a-3", 1),
    ] {
        store
            .create("posts", props(json!({"title": title, "user_id": user_id})))
            .unwrap();
    }

    let titles: Vec<String> = store
        .get_children("posts", "users", &json!(1))
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["a-1", "a-2", "a-3"]);
}

/// A live parent with no children is an empty sequence, not an error.
#[test]
fn test_childless_parent_is_empty() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let children = store.get_children("posts", "users", &json!(1)).unwrap();
    assert!(children.is_empty());
}

/// String and number foreign keys address the same parent.
#[test]
fn test_foreign_key_canonicalization() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    store
        .create(
            "posts",
            props(json!({"title": "Stringly", "user_id": "1"})),
        )
        .unwrap();

    assert_eq!(store.get_children("posts", "users", &json!(1)).unwrap().len(), 1);
    assert_eq!(
        store
            .get_children("posts", "users", &json!("1"))
            .unwrap()
            .len(),
        1
    );
}

// =============================================================================
// Relationship Error Tests
// =============================================================================

/// Enumerating through an undeclared relationship is a bad request.
#[test]
fn test_undeclared_relationship() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    // users declares no parent at all
    let err = store.get_children("users", "posts", &json!(1)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);

    // posts has a parent, but not this one
    store
        .add_resource(Resource::new("teams", vec![FieldDef::string("name")]))
        .unwrap();
    let err = store.get_children("posts", "teams", &json!(1)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);
}

/// The parent key must identify a live parent record.
#[test]
fn test_parent_key_must_be_live() {
    let store = blog_store();
    let user = store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let err = store.get_children("posts", "users", &json!(42)).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectNotFound);

    store.delete("users", &user["id"]).unwrap();
    let err = store.get_children("posts", "users", &user["id"]).unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::ObjectAlreadyDeleted);
}

/// Creating a child without its foreign key is a bad request.
#[test]
fn test_create_child_requires_foreign_key() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let err = store
        .create("posts", props(json!({"title": "Orphan"})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);
    assert_eq!(store.count("posts").unwrap(), 0);
}

/// A foreign key referencing no live parent record is a bad request.
#[test]
fn test_create_child_with_dangling_reference() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();

    let err = store
        .create("posts", props(json!({"title": "Dangling", "user_id": 42})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);

    store.delete("users", &json!(1)).unwrap();
    let err = store
        .create("posts", props(json!({"title": "Late", "user_id": 1})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);
}

// =============================================================================
// Reparenting Tests
// =============================================================================

/// modify can move a child to another live parent, but not to a dead one.
#[test]
fn test_reparenting() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    store.create("users", props(json!({"name": "Bob"}))).unwrap();
    let post = store
        .create("posts", props(json!({"title": "Mine", "user_id": 1})))
        .unwrap();

    store
        .modify("posts", &post["id"], props(json!({"user_id": 2})))
        .unwrap();
    assert!(store.get_children("posts", "users", &json!(1)).unwrap().is_empty());
    assert_eq!(store.get_children("posts", "users", &json!(2)).unwrap().len(), 1);

    let err = store
        .modify("posts", &post["id"], props(json!({"user_id": 42})))
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::BadRequest);
    // The failed move left the record where it was
    assert_eq!(store.get_children("posts", "users", &json!(2)).unwrap().len(), 1);
}

/// Deleting a parent does not cascade; existing children stay enumerable
/// through a new parent only.
#[test]
fn test_no_cascade_on_parent_delete() {
    let store = blog_store();
    store
        .create("users", props(json!({"name": "Alice"})))
        .unwrap();
    let post = store
        .create("posts", props(json!({"title": "Kept", "user_id": 1})))
        .unwrap();

    store.delete("users", &json!(1)).unwrap();

    // The child record itself is untouched
    assert_eq!(store.count("posts").unwrap(), 1);
    assert_eq!(store.get("posts", &post["id"]).unwrap()["title"], json!("Kept"));
}
