use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use scopestore::{
    StorageChangeType, StorageContainer,
    constants::ALL_KEYS,
    container::{InMemory, change_handler},
};

type Seen = Arc<Mutex<Vec<(StorageChangeType, String, Option<Value>)>>>;

fn recording_container() -> (InMemory, Seen) {
    let container = InMemory::new();
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    container.register_on_change(change_handler(move |change_type, key, value| {
        sink.lock().unwrap().push((change_type, key, value));
        async { Ok(()) }
    }));
    (container, seen)
}

#[tokio::test]
async fn test_external_changes_reach_handlers() {
    let (container, seen) = recording_container();

    container
        .apply_external_change("app", Some(json!({ "a": 1 })))
        .await
        .unwrap();
    container.apply_external_change("app", None).await.unwrap();
    container.clear_external().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (
                StorageChangeType::Update,
                "app".to_string(),
                Some(json!({ "a": 1 }))
            ),
            (StorageChangeType::Delete, "app".to_string(), None),
            (StorageChangeType::Cleared, ALL_KEYS.to_string(), None),
        ]
    );
}

#[tokio::test]
async fn test_own_writes_are_silent() {
    let (container, seen) = recording_container();

    container.set_item("app", json!({})).await.unwrap();
    container.remove_item("app").await.unwrap();
    container.clear().await.unwrap();

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let container = InMemory::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for id in 0..3 {
        let order = Arc::clone(&order);
        container.register_on_change(change_handler(move |_, _, _| {
            order.lock().unwrap().push(id);
            async { Ok(()) }
        }));
    }

    container
        .apply_external_change("a", Some(json!(1)))
        .await
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_external_change_is_visible_to_handlers() {
    let container = Arc::new(InMemory::new());
    let observed = Arc::new(Mutex::new(None));

    let reader = Arc::clone(&container);
    let sink = Arc::clone(&observed);
    container.register_on_change(change_handler(move |_, key, _| {
        let reader = Arc::clone(&reader);
        let sink = Arc::clone(&sink);
        async move {
            let current = reader.get_item(&key).await?;
            *sink.lock().unwrap() = current;
            Ok(())
        }
    }));

    container
        .apply_external_change("app", Some(json!({ "fresh": true })))
        .await
        .unwrap();
    assert_eq!(*observed.lock().unwrap(), Some(json!({ "fresh": true })));
}
