//! Change records published by scoped views and reported by containers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of change made to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageChangeType {
    /// A key was removed.
    Delete,
    /// A key was set.
    Update,
    /// A whole scope (or container) was reset.
    Cleared,
    /// The container changed underneath the view, outside of its own writes.
    ContainerChange,
}

impl StorageChangeType {
    /// The wire name of this change type.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageChangeType::Delete => "DELETE",
            StorageChangeType::Update => "UPDATE",
            StorageChangeType::Cleared => "CLEARED",
            StorageChangeType::ContainerChange => "CONTAINER_CHANGE",
        }
    }
}

impl fmt::Display for StorageChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation observed through a scoped view.
///
/// `snapshot` is the full state of the view after the mutation, i.e. what a
/// `get_all()` issued right after the write would return. `null` stands for a
/// scope that does not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    /// The type of change made.
    #[serde(rename = "type")]
    pub change_type: StorageChangeType,
    /// The key that was changed, relative to the view. Empty for `Cleared`.
    pub key: String,
    /// The value the key was changed to. `None` for deletions and clears.
    pub value: Option<Value>,
    /// The current state of the view.
    pub snapshot: Value,
}

impl StorageChange {
    pub fn update(key: impl Into<String>, value: Value, snapshot: Value) -> Self {
        Self {
            change_type: StorageChangeType::Update,
            key: key.into(),
            value: Some(value),
            snapshot,
        }
    }

    pub fn delete(key: impl Into<String>, snapshot: Value) -> Self {
        Self {
            change_type: StorageChangeType::Delete,
            key: key.into(),
            value: None,
            snapshot,
        }
    }

    pub fn cleared(snapshot: Value) -> Self {
        Self {
            change_type: StorageChangeType::Cleared,
            key: String::new(),
            value: None,
            snapshot,
        }
    }

    pub fn container_change(key: impl Into<String>, snapshot: Value) -> Self {
        Self {
            change_type: StorageChangeType::ContainerChange,
            key: key.into(),
            value: None,
            snapshot,
        }
    }
}
