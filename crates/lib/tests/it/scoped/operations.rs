use serde_json::{Value, json};

use crate::helpers::{ready_scope, test_storage};

#[tokio::test]
async fn test_set_then_get_round_trips() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;

    let values = [
        json!(null),
        json!(true),
        json!(-3),
        json!(2.5),
        json!("text"),
        json!([1, "two", { "three": 3 }]),
        json!({ "nested": { "deep": [] } }),
    ];
    for (index, value) in values.into_iter().enumerate() {
        let key = format!("key{index}");
        view.set_item(&key, value.clone()).await.unwrap();
        assert_eq!(view.get_item(&key).await.unwrap(), Some(value));
    }
}

#[tokio::test]
async fn test_get_missing_key() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({ "a": 1 })).await;

    assert_eq!(view.get_item("missing").await.unwrap(), None);
    assert_eq!(view.get_item("a").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_set_writes_into_root_entry() {
    let storage = test_storage().await;
    storage
        .set_item("app", json!({ "other": true }))
        .await
        .unwrap();
    let view = ready_scope(&storage, "app.settings", json!({})).await;

    view.set_item("theme", "dark").await.unwrap();
    assert_eq!(
        storage.get_item("app").await.unwrap(),
        Some(json!({ "other": true, "settings": { "theme": "dark" } }))
    );
}

#[tokio::test]
async fn test_set_replaces_existing_value() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({ "a": { "b": 1 } })).await;

    view.set_item("a", 5).await.unwrap();
    assert_eq!(view.get_all().await.unwrap(), json!({ "a": 5 }));
}

#[tokio::test]
async fn test_remove_item() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({ "a": 1, "b": 2 })).await;

    view.remove_item("a").await.unwrap();
    assert_eq!(view.get_all().await.unwrap(), json!({ "b": 2 }));
    assert!(!view.has_item("a").await.unwrap());

    // Removing a missing key is not an error
    view.remove_item("a").await.unwrap();
    assert_eq!(view.get_all().await.unwrap(), json!({ "b": 2 }));
}

#[tokio::test]
async fn test_has_item() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({ "a": null })).await;

    assert!(view.has_item("a").await.unwrap());
    assert!(!view.has_item("b").await.unwrap());

    view.set_item("b", false).await.unwrap();
    assert!(view.has_item("b").await.unwrap());
}

#[tokio::test]
async fn test_has_item_false_when_intermediate_missing() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings.ui", json!({ "a": 1 })).await;

    storage
        .set_item("app", json!({ "settings": {} }))
        .await
        .unwrap();
    assert!(!view.has_item("a").await.unwrap());
    assert_eq!(view.get_item("a").await.unwrap(), None);
    assert_eq!(view.get_all().await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_clear_root_scope() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({ "theme": "dark" })).await;

    view.set_item("theme", "light").await.unwrap();
    view.set_item("extra", 1).await.unwrap();
    view.clear().await.unwrap();

    assert_eq!(view.get_all().await.unwrap(), json!({ "theme": "dark" }));
    assert_eq!(
        storage.get_item("app").await.unwrap(),
        Some(json!({ "theme": "dark" }))
    );
}

#[tokio::test]
async fn test_clear_nested_scope_keeps_siblings() {
    let storage = test_storage().await;
    storage
        .set_item("app", json!({ "sibling": { "kept": true } }))
        .await
        .unwrap();
    let view = ready_scope(&storage, "app.settings", json!({ "a": 1 })).await;

    view.set_item("a", 2).await.unwrap();
    view.set_item("b", 3).await.unwrap();
    view.clear().await.unwrap();

    assert_eq!(view.get_all().await.unwrap(), json!({ "a": 1 }));
    assert_eq!(
        storage.get_item("app").await.unwrap(),
        Some(json!({ "sibling": { "kept": true }, "settings": { "a": 1 } }))
    );
}

#[tokio::test]
async fn test_clear_uses_fresh_default_each_time() {
    let storage = test_storage().await;
    let view = storage.scope("app");
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls = counter.clone();
    view.initialize(move || {
        let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        json!({ "generation": n })
    })
    .await
    .unwrap();

    view.clear().await.unwrap();
    assert_eq!(view.get_all().await.unwrap(), json!({ "generation": 1 }));
    view.clear().await.unwrap();
    assert_eq!(view.get_all().await.unwrap(), json!({ "generation": 2 }));
}

#[tokio::test]
async fn test_clear_recreates_missing_root_at_depth_one() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({ "a": 1 })).await;

    storage.remove_item("app").await.unwrap();
    view.clear().await.unwrap();
    assert_eq!(storage.get_item("app").await.unwrap(), Some(json!({ "a": 1 })));
}

#[tokio::test]
async fn test_missing_root_makes_writes_no_ops() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({})).await;
    storage.remove_item("app").await.unwrap();
    let mut changes = view.changes();

    view.set_item("a", 1).await.unwrap();
    view.remove_item("b").await.unwrap();

    assert!(!storage.has_item("app").await.unwrap());
    assert_eq!(changes.try_recv(), None);
    assert_eq!(view.get_all().await.unwrap(), Value::Null);
    assert!(!view.has_item("a").await.unwrap());
}

#[tokio::test]
async fn test_null_root_counts_as_missing() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    storage.set_item("app", Value::Null).await.unwrap();
    let mut changes = view.changes();

    view.set_item("a", 1).await.unwrap();
    assert_eq!(storage.get_item("app").await.unwrap(), Some(Value::Null));
    assert_eq!(changes.try_recv(), None);
}

#[tokio::test]
async fn test_clear_on_missing_root_still_emits() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({})).await;
    storage.remove_item("app").await.unwrap();
    let mut changes = view.changes();

    view.clear().await.unwrap();
    assert!(!storage.has_item("app").await.unwrap());

    let change = changes.try_recv().unwrap();
    assert_eq!(change.key, "");
    assert_eq!(change.snapshot, Value::Null);
}

#[tokio::test]
async fn test_set_past_end_of_list_pads_with_null() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.list", json!([1, 2])).await;
    let mut changes = view.changes();

    view.set_item("5", "x").await.unwrap();

    let expected = json!([1, 2, null, null, null, "x"]);
    assert_eq!(view.get_all().await.unwrap(), expected);
    assert_eq!(changes.try_recv().unwrap().snapshot, expected);
}

#[tokio::test]
async fn test_named_key_on_list_is_skipped() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.list", json!([1, 2])).await;
    let mut changes = view.changes();

    view.set_item("name", "x").await.unwrap();

    assert_eq!(view.get_all().await.unwrap(), json!([1, 2]));
    assert_eq!(
        storage.get_item("app").await.unwrap(),
        Some(json!({ "list": [1, 2] }))
    );
    assert_eq!(changes.try_recv(), None);
}

#[tokio::test]
async fn test_scalar_root_is_replaced_by_write() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let mut changes = view.changes();

    for scalar in [json!(0), json!(""), json!(false)] {
        storage.set_item("app", scalar).await.unwrap();
        view.set_item("a", 1).await.unwrap();
        assert_eq!(storage.get_item("app").await.unwrap(), Some(json!({ "a": 1 })));
        assert_eq!(changes.try_recv().unwrap().snapshot, json!({ "a": 1 }));
    }
}
