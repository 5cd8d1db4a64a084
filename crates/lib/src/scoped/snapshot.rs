//! Latest-value cache for a scoped view.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::watch;

/// Holds the most recent snapshot of a view.
///
/// The slot is `None` until initialization seeds it. Closing drops the sender but
/// keeps a receiver, so the last value stays readable.
pub(crate) struct SnapshotCache {
    sender: Mutex<Option<watch::Sender<Option<Value>>>>,
    receiver: watch::Receiver<Option<Value>>,
}

impl SnapshotCache {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<watch::Sender<Option<Value>>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached value. Ignored once closed.
    pub(crate) fn publish(&self, snapshot: Value) {
        if let Some(sender) = self.lock().as_ref() {
            sender.send_replace(Some(snapshot));
        }
    }

    /// The cached value, or an empty mapping before the first publish.
    pub(crate) fn last(&self) -> Value {
        self.receiver
            .borrow()
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub(crate) fn is_seeded(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    pub(crate) fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription {
            receiver: self.receiver.clone(),
            started: false,
        }
    }

    pub(crate) fn close(&self) {
        self.lock().take();
    }
}

impl std::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("seeded", &self.is_seeded())
            .finish_non_exhaustive()
    }
}

/// A subscription to the snapshots of one scoped view.
///
/// The first call to [`next`](Self::next) yields the current snapshot (once there
/// is one); later calls yield each newer snapshot. Intermediate values published
/// while the subscriber was not polling are skipped, only the newest is seen.
#[derive(Debug)]
pub struct SnapshotSubscription {
    receiver: watch::Receiver<Option<Value>>,
    started: bool,
}

impl SnapshotSubscription {
    /// Waits for the next snapshot. Returns `None` once the view was destroyed
    /// and the last snapshot was delivered.
    pub async fn next(&mut self) -> Option<Value> {
        if !self.started {
            self.started = true;
            let current = self.receiver.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }

        loop {
            if self.receiver.changed().await.is_err() {
                return None;
            }
            let current = self.receiver.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
    }
}
