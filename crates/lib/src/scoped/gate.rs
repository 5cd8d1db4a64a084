//! One-shot readiness signal for a scoped view.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateState {
    /// Initialization has not finished yet.
    Pending,
    /// The view is ready for use.
    Open,
    /// The view was destroyed. Terminal.
    Closed,
}

/// A gate that starts pending, may open once, and may be closed at any time.
///
/// Waiters are released by either transition.
#[derive(Debug)]
pub(crate) struct ReadinessGate {
    state: watch::Sender<GateState>,
}

impl ReadinessGate {
    pub(crate) fn new() -> Self {
        Self {
            state: watch::Sender::new(GateState::Pending),
        }
    }

    pub(crate) fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Opens a pending gate. Returns `false` if it was already open or closed.
    pub(crate) fn open(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = GateState::Open;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn close(&self) {
        self.state.send_replace(GateState::Closed);
    }

    /// Suspends while the gate is pending and returns the state that released it.
    pub(crate) async fn wait(&self) -> GateState {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| *state != GateState::Pending).await {
            Ok(state) => *state,
            // The sender lives as long as `self`.
            Err(_) => GateState::Closed,
        }
    }
}
