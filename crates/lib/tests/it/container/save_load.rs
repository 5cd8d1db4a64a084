use std::fs;

use serde_json::json;
use tempfile::TempDir;

use scopestore::{StorageContainer, container::InMemory};

#[tokio::test]
async fn test_in_memory_save_and_load() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("container.json");

    {
        let container = InMemory::new();
        container
            .set_item("app", json!({ "settings": { "theme": "dark" } }))
            .await
            .unwrap();
        container.set_item("counter", json!(3)).await.unwrap();
        container.save_to_file(&file_path).await.unwrap();
    }

    assert!(file_path.exists());

    let loaded = InMemory::load_from_file(&file_path).await.unwrap();
    assert_eq!(
        loaded.get_item("app").await.unwrap(),
        Some(json!({ "settings": { "theme": "dark" } }))
    );
    assert_eq!(loaded.get_item("counter").await.unwrap(), Some(json!(3)));
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let container = InMemory::load_from_file(dir.path().join("missing.json"))
        .await
        .unwrap();
    assert!(container.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("invalid.json");
    fs::write(&file_path, "{ this is not json").unwrap();

    let err = InMemory::load_from_file(&file_path).await.unwrap_err();
    assert!(err.is_serialization_error());
    assert!(err.is_container_error());
}

#[tokio::test]
async fn test_save_to_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("no").join("such").join("dir.json");

    let err = InMemory::new().save_to_file(&file_path).await.unwrap_err();
    assert!(err.is_io_error());
}
