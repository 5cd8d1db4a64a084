//! Multicast change stream for a scoped view.
//!
//! Events are delivered to the subscribers that exist when they are sent; nothing
//! is replayed. Closing the stream drops the sender, so subscribers drain what
//! was already sent and then observe completion.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::change::StorageChange;

pub(crate) struct ChangeStream {
    sender: Mutex<Option<broadcast::Sender<StorageChange>>>,
}

impl ChangeStream {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<broadcast::Sender<StorageChange>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> ChangeSubscription {
        let receiver = match self.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                // Already closed: hand out a receiver whose sender is gone.
                let (_, receiver) = broadcast::channel(1);
                receiver
            }
        };
        ChangeSubscription { receiver }
    }

    /// Sends `change` to the current subscribers and returns how many there were.
    ///
    /// Sending on a closed stream, or with nobody listening, drops the event.
    pub(crate) fn send(&self, change: StorageChange) -> usize {
        match self.lock().as_ref() {
            Some(sender) => sender.send(change).unwrap_or(0),
            None => 0,
        }
    }

    /// Completes the stream. Returns `false` if it was already closed.
    pub(crate) fn close(&self) -> bool {
        self.lock().take().is_some()
    }
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.lock().as_ref().map(broadcast::Sender::receiver_count);
        f.debug_struct("ChangeStream")
            .field("subscribers", &subscribers)
            .finish()
    }
}

/// A subscription to the change events of one scoped view.
///
/// Only events sent after the subscription was created are observed.
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<StorageChange>,
}

impl ChangeSubscription {
    /// Waits for the next change event.
    ///
    /// Returns `None` once the view was destroyed and every earlier event was
    /// received. A subscriber that falls more than the configured capacity behind
    /// loses the oldest events; this is logged and reception continues.
    pub async fn recv(&mut self) -> Option<StorageChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Closed) => return None,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change subscriber lagged, events were dropped");
                }
            }
        }
    }

    /// Returns the next change event if one is already queued.
    pub fn try_recv(&mut self) -> Option<StorageChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) => return Some(change),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Change subscriber lagged, events were dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
