//! Backing containers for Scopestore.
//!
//! A container is a flat async key-value store. Scoped views keep their whole tree
//! under a single container key and read/write it as one value, so a container
//! only needs whole-value operations over string keys.
//!
//! Containers also accept change handlers. A handler hears about changes that did
//! *not* come through the container's own `set_item`/`remove_item`/`clear` calls,
//! e.g. another process touching the same file, or a remote replica. What counts
//! as out-of-band is up to the implementation; the bundled containers expose
//! `apply_external_change` for it.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Result, change::StorageChangeType};

mod errors;
pub use errors::ContainerError;

mod in_memory;
pub use in_memory::InMemory;

#[cfg(feature = "sqlite")]
pub mod sql;
#[cfg(feature = "sqlite")]
pub use sql::Sqlite;

/// Future returned by an [`OnChangeHandler`].
pub type ChangeHandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Callback invoked with `(type, key, value)` when a container changes out-of-band.
///
/// `key` is [`crate::constants::ALL_KEYS`] when every key changed at once.
pub type OnChangeHandler =
    Arc<dyn Fn(StorageChangeType, String, Option<Value>) -> ChangeHandlerFuture + Send + Sync>;

/// Wraps an async closure into an [`OnChangeHandler`].
///
/// ```rust
/// # use scopestore::container::{change_handler, InMemory, StorageContainer};
/// let container = InMemory::new();
/// let id = container.register_on_change(change_handler(|change_type, key, _value| async move {
///     println!("{change_type} on {key}");
///     Ok(())
/// }));
/// assert!(container.remove_on_change(id));
/// ```
pub fn change_handler<F, Fut>(handler: F) -> OnChangeHandler
where
    F: Fn(StorageChangeType, String, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |change_type, key, value| {
        let fut = handler(change_type, key, value);
        Box::pin(fut) as ChangeHandlerFuture
    })
}

/// Identifies a registered [`OnChangeHandler`] so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Flat async key-value storage backing one or more scoped views.
///
/// All implementations must be `Send` and `Sync` so one container can be shared by
/// every view derived from the same [`crate::Storage`].
#[async_trait]
pub trait StorageContainer: Send + Sync {
    /// Registers a handler that is told about out-of-band changes.
    ///
    /// Handlers are never invoked for writes made through this trait.
    fn register_on_change(&self, handler: OnChangeHandler) -> HandlerId;

    /// Removes a handler added with `register_on_change`.
    ///
    /// Returns `false` if `id` is not registered (anymore).
    fn remove_on_change(&self, id: HandlerId) -> bool;

    /// Invoked when the container is being attached.
    async fn attach(&self) -> Result<()>;

    /// Invoked when the container is being detached.
    async fn detach(&self) -> Result<()>;

    /// Gets an item from storage, `None` if the key does not exist.
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    /// Sets an item in storage, replacing any previous value.
    async fn set_item(&self, key: &str, value: Value) -> Result<()>;

    /// Removes an item from storage. Removing a missing key succeeds.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Clears all items from storage.
    async fn clear(&self) -> Result<()>;

    /// Gets all items from storage.
    async fn get_all(&self) -> Result<HashMap<String, Value>>;

    /// Determines whether an item exists in storage.
    async fn has_item(&self, key: &str) -> Result<bool>;
}

/// Typed access on top of any [`StorageContainer`].
#[async_trait]
pub trait StorageContainerExt: StorageContainer {
    /// Gets an item and deserializes it into `T`.
    async fn get_item_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_item(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes `value` and stores it under `key`.
    async fn set_item_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_item(key, value).await
    }
}

impl<C: StorageContainer + ?Sized> StorageContainerExt for C {}

/// The handlers registered with one container.
///
/// Handlers run sequentially in registration order. A failing handler does not stop
/// the remaining ones; the first error is returned once all of them ran.
#[derive(Default)]
pub(crate) struct ChangeHandlers {
    handlers: std::sync::Mutex<Vec<(HandlerId, OnChangeHandler)>>,
    next_id: AtomicU64,
}

impl ChangeHandlers {
    pub(crate) fn register(&self, handler: OnChangeHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, handler));
        id
    }

    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        handlers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) async fn dispatch(
        &self,
        change_type: StorageChangeType,
        key: &str,
        value: Option<Value>,
    ) -> Result<()> {
        // Clone the handlers to avoid holding the lock while they run.
        let handlers = self.lock().clone();

        let mut first_error = None;
        for (_, handler) in handlers {
            if let Err(e) = handler(change_type, key.to_string(), value.clone()).await {
                tracing::error!(%change_type, key, "Container change handler failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(HandlerId, OnChangeHandler)>> {
        self.handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChangeHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHandlers")
            .field("count", &self.len())
            .finish()
    }
}
