//! Persistence operations for InMemory containers
//!
//! This module handles serialization and file I/O for saving/loading
//! the in-memory container state to/from JSON files.

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InMemory;
use crate::{Error, Result, constants::PERSISTENCE_VERSION, container::ContainerError};

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Serializable form of an InMemory container
#[derive(Serialize, Deserialize)]
struct SerializableContainer {
    /// File format version for compatibility checking
    #[serde(rename = "_v", default, skip_serializing_if = "is_v0")]
    version: u8,
    #[serde(default)]
    items: HashMap<String, Value>,
}

/// Saves all items of `container` to a specified file as JSON.
pub(crate) async fn save_to_file<P: AsRef<Path>>(container: &InMemory, path: P) -> Result<()> {
    let items = container.items.read().await.clone();
    let serializable = SerializableContainer {
        version: PERSISTENCE_VERSION,
        items,
    };

    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { ContainerError::SerializationFailed { source: e }.into() })?;
    tokio::fs::write(path.as_ref(), json)
        .await
        .map_err(|e| -> Error { ContainerError::FileIo { source: e }.into() })?;
    tracing::debug!(path = %path.as_ref().display(), "Saved InMemory container");
    Ok(())
}

/// Loads a container from a specified JSON file.
///
/// If the file does not exist, a new, empty `InMemory` container is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    match tokio::fs::read_to_string(path.as_ref()).await {
        Ok(json) => {
            let serializable: SerializableContainer =
                serde_json::from_str(&json).map_err(|e| -> Error {
                    ContainerError::DeserializationFailed { source: e }.into()
                })?;
            if serializable.version != PERSISTENCE_VERSION {
                return Err(ContainerError::UnsupportedVersion {
                    version: serializable.version,
                    supported: PERSISTENCE_VERSION,
                }
                .into());
            }
            Ok(InMemory::with_items(serializable.items))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InMemory::new()),
        Err(e) => Err(ContainerError::FileIo { source: e }.into()),
    }
}
