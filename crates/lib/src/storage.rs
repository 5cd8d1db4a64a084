//! Shared handle to one backing container.
//!
//! [`Storage`] is the entry point for creating scoped views. It is cheap to clone
//! and every clone, and every view created from it, talks to the same container.

use std::{collections::HashMap, sync::Arc};

use handle_trait::Handle;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Result,
    constants::DEFAULT_CHANGE_CAPACITY,
    container::{HandlerId, OnChangeHandler, StorageContainer},
    path::StoragePath,
    scoped::ScopedStorage,
};

/// Settings shared by every view created from one [`Storage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of change events buffered per subscriber before it starts lagging.
    pub change_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            change_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }
}

/// Handle to a backing container.
///
/// This is a thin passthrough over the container plus the factory for scoped views.
/// Cloning is cheap; clones share the container.
#[derive(Clone, Handle)]
pub struct Storage {
    container: Arc<dyn StorageContainer>,
    config: Arc<StorageConfig>,
}

impl Storage {
    /// Create a new handle owning `container`.
    pub fn new(container: impl StorageContainer + 'static) -> Self {
        Self::from_arc(Arc::new(container))
    }

    /// Create a handle to a container that is already shared.
    pub fn from_arc(container: Arc<dyn StorageContainer>) -> Self {
        Self {
            container,
            config: Arc::new(StorageConfig::default()),
        }
    }

    /// Replace the configuration used by views created from this handle.
    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The shared container.
    pub fn container(&self) -> &Arc<dyn StorageContainer> {
        &self.container
    }

    /// Create a depth-1 view over the root entry `root_key`.
    ///
    /// No I/O happens until the view is initialized.
    pub fn scope(&self, root_key: impl Into<String>) -> ScopedStorage {
        self.scope_path(StoragePath::root_only(root_key))
    }

    /// Create a view at an arbitrary path.
    pub fn scope_path(&self, path: StoragePath) -> ScopedStorage {
        ScopedStorage::new(self.handle(), path)
    }

    /// Register a handler for out-of-band container changes
    pub fn register_on_change(&self, handler: OnChangeHandler) -> HandlerId {
        self.container.register_on_change(handler)
    }

    /// Remove a handler added with [`register_on_change`](Self::register_on_change)
    pub fn remove_on_change(&self, id: HandlerId) -> bool {
        self.container.remove_on_change(id)
    }

    pub async fn attach(&self) -> Result<()> {
        self.container.attach().await
    }

    pub async fn detach(&self) -> Result<()> {
        self.container.detach().await
    }

    /// Get a raw container entry
    pub async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.container.get_item(key).await
    }

    /// Set a raw container entry
    pub async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.container.set_item(key, value).await
    }

    /// Remove a raw container entry
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        self.container.remove_item(key).await
    }

    /// Remove every container entry
    pub async fn clear(&self) -> Result<()> {
        self.container.clear().await
    }

    pub async fn get_all(&self) -> Result<HashMap<String, Value>> {
        self.container.get_all().await
    }

    pub async fn has_item(&self, key: &str) -> Result<bool> {
        self.container.has_item(key).await
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
