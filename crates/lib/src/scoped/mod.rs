//! Scoped views over a backing container.
//!
//! A [`ScopedStorage`] addresses one subtree of a root entry. All reads and writes
//! fetch the whole root entry, work on the subtree at the view's path and persist
//! the whole root entry again. Every mutation is then published on the view's
//! change stream, together with the view's state after the write.
//!
//! # Lifecycle
//!
//! ```text
//! Created --initialize()--> Initializing --done--> Ready --destroy()--> Destroyed
//!    ^                          |
//!    +------ container error ---+
//! ```
//!
//! Data operations suspend until the view is `Ready`. A view that is never
//! initialized therefore blocks its callers forever. `destroy()` is valid in every
//! state; afterwards every operation fails with [`ScopeError::Destroyed`].
//!
//! # Missing root entry
//!
//! `set_item` and `remove_item` silently do nothing when the root entry is missing
//! (or `null`) at call time: nothing is written and no event is published. This
//! happens when another party removed the root entry after initialization. It is
//! logged at debug level but never reported as an error, so callers that need to
//! know must check [`ScopedStorage::has_item`] or [`ScopedStorage::get_all`].
//!
//! Only a missing or `null` root entry counts as missing. Any other scalar (`0`,
//! `""`, `false`) is an existing root entry, and writing through it replaces it
//! with a mapping that holds the written key.
//!
//! # Lists
//!
//! Keys address list elements by decimal index. Writing past the end of a list
//! pads it with `null`. A write whose path uses any other key on a list is
//! skipped the same way as a missing root entry, so the list's elements are never
//! discarded.
//!
//! # Concurrency
//!
//! Read-modify-write cycles are not serialized. Two writes that run concurrently
//! against the same root entry (on one view, or on views sharing the root key) can
//! both read the old root and the second write then drops the first one's change.
//! Sequential, awaited calls are always applied and published in order.

mod changes;
mod errors;
mod gate;
mod snapshot;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use handle_trait::Handle;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

pub use changes::ChangeSubscription;
pub use errors::ScopeError;
pub use snapshot::SnapshotSubscription;

use self::{
    changes::ChangeStream,
    gate::{GateState, ReadinessGate},
    snapshot::SnapshotCache,
};
use crate::{
    Result,
    change::StorageChange,
    constants::ALL_KEYS,
    container::{HandlerId, change_handler},
    path::StoragePath,
    resolve,
    storage::Storage,
};

/// Produces the initial value of a scope.
type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Lifecycle state of a [`ScopedStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeState {
    /// Created, `initialize()` not called yet.
    Created,
    /// `initialize()` is running.
    Initializing,
    /// Initialized; data operations proceed.
    Ready,
    /// Destroyed. Terminal.
    Destroyed,
}

struct ScopeInner {
    storage: Storage,
    path: StoragePath,
    state: Mutex<ScopeState>,
    gate: ReadinessGate,
    factory: RwLock<Option<DefaultFactory>>,
    changes: ChangeStream,
    snapshots: SnapshotCache,
    /// Serializes snapshot reads with publication so the cache and the stream
    /// see events in the same order.
    publish_lock: tokio::sync::Mutex<()>,
    /// Container handler forwarding out-of-band changes, once ready.
    watcher: Mutex<Option<HandlerId>>,
}

impl ScopeInner {
    /// Removes the container handler, if one is registered.
    fn unwatch(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = watcher {
            self.storage.remove_on_change(id);
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.unwatch();
    }
}

/// A view onto the subtree at one [`StoragePath`] of a backing container.
///
/// Clones share all state: the readiness gate, the change stream and the snapshot
/// cache. Views created with [`scope`](Self::scope) share only the container.
///
/// Values are [`serde_json::Value`]s; the `*_as` methods convert to and from typed
/// data with serde.
#[derive(Clone)]
pub struct ScopedStorage {
    inner: Arc<ScopeInner>,
}

impl ScopedStorage {
    pub(crate) fn new(storage: Storage, path: StoragePath) -> Self {
        let capacity = storage.config().change_capacity;
        Self {
            inner: Arc::new(ScopeInner {
                storage,
                path,
                state: Mutex::new(ScopeState::Created),
                gate: ReadinessGate::new(),
                factory: RwLock::new(None),
                changes: ChangeStream::new(capacity),
                snapshots: SnapshotCache::new(),
                publish_lock: tokio::sync::Mutex::new(()),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// The path this view addresses.
    pub fn path(&self) -> &StoragePath {
        &self.inner.path
    }

    pub fn state(&self) -> ScopeState {
        *self.lock_state()
    }

    /// The storage handle this view reads and writes through.
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Initializes the view.
    ///
    /// Reads the root entry, creates every missing level on the way to this view's
    /// path and persists the root entry. The view itself is filled from `factory`
    /// when it does not hold a mapping or list yet; intermediate levels become
    /// empty mappings. A depth-1 view whose root entry is missing or not structured
    /// starts from `factory()` as a whole. Existing structured data is kept.
    ///
    /// `factory` is also used by [`clear`](Self::clear).
    ///
    /// # Errors
    /// - [`ScopeError::AlreadyInitialized`] if the view is initializing or ready.
    /// - [`ScopeError::Destroyed`] if the view was destroyed, also when that
    ///   happens while this call is running.
    /// - Any container error. The view then returns to `Created` and
    ///   `initialize()` may be retried.
    pub async fn initialize<F>(&self, factory: F) -> Result<()>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.begin_initialize()?;
        *self
            .inner
            .factory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(factory));

        let snapshot = match self.materialize().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let mut state = self.lock_state();
                if *state == ScopeState::Initializing {
                    *state = ScopeState::Created;
                }
                tracing::warn!(path = %self.inner.path, "Scope initialization failed: {e}");
                return Err(e);
            }
        };

        {
            let mut state = self.lock_state();
            if *state == ScopeState::Destroyed {
                return Err(self.destroyed());
            }
            self.inner.snapshots.publish(snapshot);
            *state = ScopeState::Ready;
        }
        self.inner.gate.open();
        self.watch_container();

        tracing::info!(path = %self.inner.path, "Scope ready");
        Ok(())
    }

    /// Initializes the view with the serialized `S::default()`.
    pub async fn initialize_default<S>(&self) -> Result<()>
    where
        S: Default + Serialize,
    {
        let initial = serde_json::to_value(S::default())?;
        self.initialize(move || initial.clone()).await
    }

    /// Gets the value stored under `key` in this view.
    pub async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.ready().await?;
        let root = self.read_root().await?;
        Ok(root.and_then(|root| {
            resolve::get_in(&root, &self.inner.path.nested_with(key)).cloned()
        }))
    }

    /// Gets the value stored under `key` and deserializes it into `T`.
    pub async fn get_item_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_item(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key` and publishes an `UPDATE` event.
    ///
    /// Does nothing when the root entry is missing, or when the target sits below
    /// a list under a key that is not an index. See the module docs.
    pub async fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.ready().await?;

        let Some(mut root) = self.existing_root().await? else {
            tracing::debug!(path = %self.inner.path, key, "Root entry missing, skipping set");
            return Ok(());
        };
        if !resolve::set_in(&mut root, &self.inner.path.nested_with(key), value.clone()) {
            tracing::debug!(path = %self.inner.path, key, "Key does not index a list, skipping set");
            return Ok(());
        }
        self.inner
            .storage
            .set_item(self.inner.path.root(), root)
            .await?;

        self.publish(|snapshot| StorageChange::update(key, value, snapshot))
            .await
    }

    /// Serializes `value` and stores it under `key`.
    pub async fn set_item_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.set_item(key, value).await
    }

    /// Removes `key` from this view and publishes a `DELETE` event.
    ///
    /// The event is published even if `key` did not exist. Does nothing when the
    /// root entry is missing.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        self.ready().await?;

        let Some(mut root) = self.existing_root().await? else {
            tracing::debug!(path = %self.inner.path, key, "Root entry missing, skipping remove");
            return Ok(());
        };
        resolve::unset_in(&mut root, &self.inner.path.nested_with(key));
        self.inner
            .storage
            .set_item(self.inner.path.root(), root)
            .await?;

        self.publish(|snapshot| StorageChange::delete(key, snapshot))
            .await
    }

    /// Resets this view to a fresh value from the initialization factory and
    /// publishes a `CLEARED` event.
    ///
    /// A depth-1 view replaces its whole root entry. A deeper view rewrites its
    /// subtree inside the root entry, which is skipped when the root entry is
    /// missing; the event is published either way.
    pub async fn clear(&self) -> Result<()> {
        self.ready().await?;

        let fresh = (self.factory())();
        if self.inner.path.is_root() {
            self.inner
                .storage
                .set_item(self.inner.path.root(), fresh)
                .await?;
        } else if let Some(mut root) = self.existing_root().await? {
            if resolve::set_in(&mut root, self.inner.path.nested(), fresh) {
                self.inner
                    .storage
                    .set_item(self.inner.path.root(), root)
                    .await?;
            } else {
                tracing::debug!(path = %self.inner.path, "Path does not index a list, skipping clear");
            }
        } else {
            tracing::debug!(path = %self.inner.path, "Root entry missing, skipping clear");
        }

        self.publish(StorageChange::cleared).await
    }

    /// Returns the whole state of this view, `null` if it does not exist.
    pub async fn get_all(&self) -> Result<Value> {
        self.ready().await?;
        self.read_scope().await
    }

    /// Returns the whole state of this view deserialized into `T`.
    pub async fn get_all_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.get_all().await?)?)
    }

    /// Whether `key` exists in this view. A stored `null` counts as existing.
    pub async fn has_item(&self, key: &str) -> Result<bool> {
        self.ready().await?;
        let root = self.read_root().await?;
        Ok(root.is_some_and(|root| resolve::has_in(&root, &self.inner.path.nested_with(key))))
    }

    /// Creates a view one level below this one.
    ///
    /// The new view shares the container but nothing else, and must be initialized
    /// on its own.
    pub fn scope(&self, key: impl Into<String>) -> ScopedStorage {
        ScopedStorage::new(self.inner.storage.handle(), self.inner.path.child(key))
    }

    /// Destroys the view.
    ///
    /// Completes the change stream and the snapshot subscriptions, releases callers
    /// waiting for readiness with [`ScopeError::Destroyed`] and makes every later
    /// operation fail the same way. The container is not touched. Calling this
    /// more than once is harmless.
    pub fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), ScopeState::Destroyed);
        if previous == ScopeState::Destroyed {
            return;
        }

        self.inner.gate.close();
        self.inner.unwatch();
        self.inner.changes.close();
        self.inner.snapshots.close();
        tracing::info!(path = %self.inner.path, ?previous, "Scope destroyed");
    }

    /// Subscribes to the change events published from now on.
    ///
    /// After [`destroy`](Self::destroy) the subscription is already complete.
    pub fn changes(&self) -> ChangeSubscription {
        self.inner.changes.subscribe()
    }

    /// Subscribes to snapshots, starting with the latest one.
    pub fn snapshot(&self) -> SnapshotSubscription {
        self.inner.snapshots.subscribe()
    }

    /// The latest snapshot, without waiting for readiness.
    ///
    /// Returns an empty mapping before initialization completed.
    pub fn last_snapshot(&self) -> Value {
        self.inner.snapshots.last()
    }

    fn lock_state(&self) -> MutexGuard<'_, ScopeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_initialize(&self) -> Result<()> {
        let mut state = self.lock_state();
        match *state {
            ScopeState::Created => {
                *state = ScopeState::Initializing;
                Ok(())
            }
            ScopeState::Initializing | ScopeState::Ready => Err(ScopeError::AlreadyInitialized {
                path: self.inner.path.to_string(),
            }
            .into()),
            ScopeState::Destroyed => Err(self.destroyed()),
        }
    }

    fn destroyed(&self) -> crate::Error {
        ScopeError::Destroyed {
            path: self.inner.path.to_string(),
        }
        .into()
    }

    fn factory(&self) -> DefaultFactory {
        let factory = self
            .inner
            .factory
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match factory.as_ref() {
            Some(factory) => Arc::clone(factory),
            None => Arc::new(|| Value::Object(Map::new())),
        }
    }

    /// Waits until the view is ready.
    async fn ready(&self) -> Result<()> {
        match self.inner.gate.wait().await {
            GateState::Open => Ok(()),
            GateState::Pending | GateState::Closed => Err(self.destroyed()),
        }
    }

    /// Creates the missing levels of this view's path and persists the root entry.
    /// Returns the resulting snapshot.
    async fn materialize(&self) -> Result<Value> {
        let path = &self.inner.path;
        let factory = self.factory();

        let mut root = match self.inner.storage.get_item(path.root()).await? {
            Some(root) if resolve::is_structured(&root) => root,
            _ if path.is_root() => factory(),
            _ => Value::Object(Map::new()),
        };
        let created = resolve::materialize(&mut root, path.nested(), || factory());
        tracing::debug!(%path, created, "Materialized scope");

        self.inner.storage.set_item(path.root(), root).await?;
        self.read_scope().await
    }

    async fn read_root(&self) -> Result<Option<Value>> {
        self.inner.storage.get_item(self.inner.path.root()).await
    }

    /// The root entry, if it holds anything other than `null`.
    async fn existing_root(&self) -> Result<Option<Value>> {
        Ok(self.read_root().await?.filter(|root| !root.is_null()))
    }

    async fn read_scope(&self) -> Result<Value> {
        let root = self.read_root().await?;
        Ok(root
            .and_then(|root| resolve::get_in(&root, self.inner.path.nested()).cloned())
            .unwrap_or(Value::Null))
    }

    /// Reads the current snapshot, stores it in the cache and sends the event
    /// built from it.
    async fn publish<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(Value) -> StorageChange,
    {
        let _guard = self.inner.publish_lock.lock().await;
        let snapshot = self.read_scope().await?;
        let change = build(snapshot.clone());
        let change_type = change.change_type;

        self.inner.snapshots.publish(snapshot);
        let receivers = self.inner.changes.send(change);
        tracing::debug!(path = %self.inner.path, %change_type, receivers, "Published change");
        Ok(())
    }

    /// Registers a container handler that republishes out-of-band changes to this
    /// view's root entry as `CONTAINER_CHANGE` events.
    ///
    /// The handler only holds a weak reference, so it does not keep the view alive.
    /// It is removed again by `destroy()` or when the last clone of the view drops.
    fn watch_container(&self) {
        let inner: Weak<ScopeInner> = Arc::downgrade(&self.inner);
        let id = self
            .inner
            .storage
            .register_on_change(change_handler(move |_change_type, key, _value| {
                let inner = inner.upgrade();
                async move {
                    let Some(inner) = inner else {
                        return Ok(());
                    };
                    let view = ScopedStorage { inner };
                    view.on_container_change(key).await
                }
            }));

        *self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
        // destroy() may have run before the id was stored
        if self.state() == ScopeState::Destroyed {
            self.inner.unwatch();
        }
    }

    async fn on_container_change(&self, key: String) -> Result<()> {
        if key != self.inner.path.root() && key != ALL_KEYS {
            return Ok(());
        }
        if self.inner.gate.state() != GateState::Open {
            return Ok(());
        }

        tracing::debug!(path = %self.inner.path, key, "Container changed underneath scope");
        self.publish(|snapshot| StorageChange::container_change(key, snapshot))
            .await
    }
}

impl std::fmt::Debug for ScopedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStorage")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .field("changes", &self.inner.changes)
            .field("snapshots", &self.inner.snapshots)
            .finish()
    }
}
