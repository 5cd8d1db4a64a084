//! In-memory container implementation
//!
//! This module provides an in-memory implementation of the StorageContainer trait,
//! suitable for testing, development, or single-process use where persistence is
//! handled by saving/loading the whole state to/from a JSON file.

mod persistence;

use std::{
    collections::HashMap,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ChangeHandlers, HandlerId, OnChangeHandler, StorageContainer};
use crate::{Result, change::StorageChangeType, constants::ALL_KEYS};

/// A simple in-memory container using a `HashMap` for storage.
///
/// It provides basic persistence via `save_to_file` and `load_from_file`,
/// serializing the map to JSON.
#[derive(Debug, Default)]
pub struct InMemory {
    /// Item storage with read-write lock for concurrent access
    pub(crate) items: RwLock<HashMap<String, Value>>,
    handlers: ChangeHandlers,
    attached: AtomicBool,
}

impl InMemory {
    /// Creates a new, empty `InMemory` container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container pre-populated with `items`.
    pub fn with_items(items: HashMap<String, Value>) -> Self {
        Self {
            items: RwLock::new(items),
            ..Self::default()
        }
    }

    /// Saves all items to a specified file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads a container from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemory` container is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    ///
    /// # Returns
    /// A `Result` containing the loaded container or an I/O or deserialization error.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }

    /// Number of change handlers currently registered.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Whether `attach()` was called more recently than `detach()`.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Applies a change that did not come through this process's views.
    ///
    /// `Some(value)` sets the key, `None` removes it. Registered change handlers
    /// are invoked afterwards with `UPDATE` or `DELETE`.
    pub async fn apply_external_change(&self, key: &str, value: Option<Value>) -> Result<()> {
        let change_type = {
            let mut items = self.items.write().await;
            match &value {
                Some(value) => {
                    items.insert(key.to_string(), value.clone());
                    StorageChangeType::Update
                }
                None => {
                    items.remove(key);
                    StorageChangeType::Delete
                }
            }
        };
        tracing::debug!(key, %change_type, "Applied external change");
        self.handlers.dispatch(change_type, key, value).await
    }

    /// Clears the container on behalf of an out-of-band writer.
    ///
    /// Handlers are invoked with `CLEARED` and [`ALL_KEYS`].
    pub async fn clear_external(&self) -> Result<()> {
        self.items.write().await.clear();
        tracing::debug!("Applied external clear");
        self.handlers
            .dispatch(StorageChangeType::Cleared, ALL_KEYS, None)
            .await
    }
}

#[async_trait]
impl StorageContainer for InMemory {
    fn register_on_change(&self, handler: OnChangeHandler) -> HandlerId {
        self.handlers.register(handler)
    }

    fn remove_on_change(&self, id: HandlerId) -> bool {
        self.handlers.remove(id)
    }

    async fn attach(&self) -> Result<()> {
        self.attached.store(true, Ordering::Release);
        tracing::info!("InMemory container attached");
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        self.attached.store(false, Ordering::Release);
        tracing::info!("InMemory container detached");
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.items.write().await.clear();
        Ok(())
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        Ok(self.items.read().await.clone())
    }

    async fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.items.read().await.contains_key(key))
    }
}
