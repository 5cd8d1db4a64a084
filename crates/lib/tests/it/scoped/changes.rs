use serde_json::{Value, json};

use scopestore::{StorageChange, StorageChangeType};

use crate::helpers::{ready_scope, test_storage};

#[tokio::test]
async fn test_sequential_updates_arrive_in_order() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let mut changes = view.changes();

    view.set_item("a", 1).await.unwrap();
    view.set_item("a", 2).await.unwrap();

    assert_eq!(
        changes.recv().await,
        Some(StorageChange::update("a", json!(1), json!({ "a": 1 })))
    );
    assert_eq!(
        changes.recv().await,
        Some(StorageChange::update("a", json!(2), json!({ "a": 2 })))
    );
    assert_eq!(changes.try_recv(), None);
}

#[tokio::test]
async fn test_event_shapes() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings", json!({ "theme": "dark" })).await;
    let mut changes = view.changes();

    view.set_item("size", 12).await.unwrap();
    view.remove_item("theme").await.unwrap();
    view.clear().await.unwrap();

    let update = changes.recv().await.unwrap();
    assert_eq!(update.change_type, StorageChangeType::Update);
    assert_eq!(update.key, "size");
    assert_eq!(update.value, Some(json!(12)));
    assert_eq!(update.snapshot, json!({ "theme": "dark", "size": 12 }));

    let delete = changes.recv().await.unwrap();
    assert_eq!(delete.change_type, StorageChangeType::Delete);
    assert_eq!(delete.key, "theme");
    assert_eq!(delete.value, None);
    assert_eq!(delete.snapshot, json!({ "size": 12 }));

    let cleared = changes.recv().await.unwrap();
    assert_eq!(cleared.change_type, StorageChangeType::Cleared);
    assert_eq!(cleared.key, "");
    assert_eq!(cleared.value, None);
    assert_eq!(cleared.snapshot, json!({ "theme": "dark" }));
}

#[tokio::test]
async fn test_snapshot_matches_get_all_at_emission() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app.settings.ui", json!({})).await;
    let mut changes = view.changes();

    for n in 0..5 {
        view.set_item(&format!("k{n}"), n).await.unwrap();
        let change = changes.recv().await.unwrap();
        assert_eq!(change.snapshot, view.get_all().await.unwrap());
    }
}

#[tokio::test]
async fn test_snapshot_is_scoped_not_root() {
    let storage = test_storage().await;
    storage
        .set_item("app", json!({ "unrelated": 1 }))
        .await
        .unwrap();
    let view = ready_scope(&storage, "app.settings", json!({})).await;
    let mut changes = view.changes();

    view.set_item("a", true).await.unwrap();
    assert_eq!(changes.recv().await.unwrap().snapshot, json!({ "a": true }));
}

#[tokio::test]
async fn test_no_replay_for_late_subscribers() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let mut early = view.changes();

    view.set_item("a", 1).await.unwrap();
    let mut late = view.changes();
    view.set_item("b", 2).await.unwrap();

    assert_eq!(early.recv().await.unwrap().key, "a");
    assert_eq!(early.recv().await.unwrap().key, "b");
    assert_eq!(late.recv().await.unwrap().key, "b");
    assert_eq!(late.try_recv(), None);
}

#[tokio::test]
async fn test_every_subscriber_sees_every_event() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let mut subscribers: Vec<_> = (0..3).map(|_| view.changes()).collect();

    view.set_item("a", 1).await.unwrap();
    view.remove_item("a").await.unwrap();

    for subscriber in &mut subscribers {
        let first = subscriber.recv().await.unwrap();
        let second = subscriber.recv().await.unwrap();
        assert_eq!(first.change_type, StorageChangeType::Update);
        assert_eq!(second.change_type, StorageChangeType::Delete);
    }
}

#[tokio::test]
async fn test_delete_of_missing_key_still_emits() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({ "a": 1 })).await;
    let mut changes = view.changes();

    view.remove_item("never-set").await.unwrap();
    let change = changes.recv().await.unwrap();
    assert_eq!(change.change_type, StorageChangeType::Delete);
    assert_eq!(change.snapshot, json!({ "a": 1 }));
}

#[tokio::test]
async fn test_views_have_independent_streams() {
    let storage = test_storage().await;
    let first = ready_scope(&storage, "app", json!({})).await;
    let second = ready_scope(&storage, "app", json!({})).await;
    let mut first_changes = first.changes();
    let mut second_changes = second.changes();

    first.set_item("a", 1).await.unwrap();

    assert_eq!(first_changes.recv().await.unwrap().key, "a");
    assert_eq!(second_changes.try_recv(), None);
    // The data itself is shared
    assert_eq!(second.get_item("a").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_clones_share_one_stream() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let clone = view.clone();
    let mut changes = view.changes();

    clone.set_item("from_clone", Value::Bool(true)).await.unwrap();
    assert_eq!(changes.recv().await.unwrap().key, "from_clone");
}

#[tokio::test]
async fn test_events_serialize_to_wire_shape() {
    let storage = test_storage().await;
    let view = ready_scope(&storage, "app", json!({})).await;
    let mut changes = view.changes();

    view.remove_item("gone").await.unwrap();
    let wire = serde_json::to_value(changes.recv().await.unwrap()).unwrap();
    assert_eq!(
        wire,
        json!({ "type": "DELETE", "key": "gone", "value": null, "snapshot": {} })
    );
}
