//!
//! Scopestore: scoped, path-addressable views over a flat key-value store.
//! This library provides typed-by-path access to nested data kept under a single
//! root entry of a backing container, plus change notification for every
//! mutation made through a view.
//!
//! ## Core Concepts
//!
//! * **Containers (`container::StorageContainer`)**: The pluggable, flat, async key-value
//!   store that physically holds data. `InMemory` (with JSON file persistence) is always
//!   available; `Sqlite` requires the "sqlite" feature.
//! * **Storage (`storage::Storage`)**: A cheap-to-clone handle to one container. All views
//!   created from it share the same container.
//! * **Paths (`path::StoragePath`)**: A non-empty key sequence. The first key names the
//!   root entry in the container, the remaining keys walk into that entry's value.
//! * **Scoped views (`scoped::ScopedStorage`)**: Read/write access relative to a path,
//!   gated on a one-shot initialization that materializes missing nested structure.
//! * **Change events (`change::StorageChange`)**: Published after every mutation made
//!   through a view, together with the resulting snapshot of that view.
//!
//! ## Example
//!
//! ```rust
//! # use scopestore::{Storage, container::InMemory};
//! # use serde_json::json;
//! # #[tokio::main]
//! # async fn main() -> scopestore::Result<()> {
//! let storage = Storage::new(InMemory::new());
//!
//! let settings = storage.scope("app").scope("settings");
//! settings.initialize(|| json!({ "theme": "dark" })).await?;
//!
//! let mut changes = settings.changes();
//! settings.set_item("font_size", 14).await?;
//!
//! let change = changes.recv().await.expect("stream is open");
//! assert_eq!(change.snapshot, json!({ "theme": "dark", "font_size": 14 }));
//! # Ok(())
//! # }
//! ```

pub mod change;
pub mod constants;
pub mod container;
pub mod path;
pub mod resolve;
pub mod scoped;
pub mod storage;

pub use change::{StorageChange, StorageChangeType};
pub use container::{StorageContainer, StorageContainerExt};
pub use path::StoragePath;
pub use scoped::{ChangeSubscription, ScopeState, ScopedStorage, SnapshotSubscription};
pub use storage::{Storage, StorageConfig};

/// Result type used throughout the Scopestore library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Scopestore library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from backing containers
    #[error(transparent)]
    Container(container::ContainerError),

    /// Structured errors from scoped views
    #[error(transparent)]
    Scope(scoped::ScopeError),

    /// Path validation errors
    #[error(transparent)]
    Path(path::PathError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
            Error::Container(_) => "container",
            Error::Scope(_) => "scoped",
            Error::Path(_) => "path",
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Container(container_err) => container_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error is a serialization failure.
    pub fn is_serialization_error(&self) -> bool {
        match self {
            Error::Serialize(_) => true,
            Error::Container(container_err) => container_err.is_serialization_error(),
            _ => false,
        }
    }

    /// Check if this error came from a backing container.
    pub fn is_container_error(&self) -> bool {
        matches!(self, Error::Container(_))
    }

    /// Check if this error indicates a view was used after `destroy()`.
    pub fn is_destroyed(&self) -> bool {
        match self {
            Error::Scope(scope_err) => scope_err.is_destroyed(),
            _ => false,
        }
    }

    /// Check if this error indicates a repeated `initialize()`.
    pub fn is_already_initialized(&self) -> bool {
        match self {
            Error::Scope(scope_err) => scope_err.is_already_initialized(),
            _ => false,
        }
    }

    /// Check if this error is path-related.
    pub fn is_path_error(&self) -> bool {
        matches!(self, Error::Path(_))
    }
}
