//! Error types for scoped views.

use thiserror::Error;

/// Errors raised by a [`crate::ScopedStorage`] because of its lifecycle state.
///
/// Failures of the backing container are never wrapped in this type; they reach
/// the caller as [`crate::Error::Container`] (or whatever the container returned).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ScopeError {
    /// `initialize()` was called on a view that is initializing or ready.
    #[error("Scope '{path}' is already initialized")]
    AlreadyInitialized {
        /// Dotted path of the view
        path: String,
    },

    /// The view was destroyed.
    #[error("Scope '{path}' has been destroyed")]
    Destroyed {
        /// Dotted path of the view
        path: String,
    },
}

impl ScopeError {
    /// Check if this error indicates use after `destroy()`.
    pub fn is_destroyed(&self) -> bool {
        matches!(self, ScopeError::Destroyed { .. })
    }

    /// Check if this error indicates a repeated `initialize()`.
    pub fn is_already_initialized(&self) -> bool {
        matches!(self, ScopeError::AlreadyInitialized { .. })
    }

    /// The dotted path of the view that raised the error.
    pub fn path(&self) -> &str {
        match self {
            ScopeError::AlreadyInitialized { path } | ScopeError::Destroyed { path } => path,
        }
    }
}

impl From<ScopeError> for crate::Error {
    fn from(err: ScopeError) -> Self {
        crate::Error::Scope(err)
    }
}
