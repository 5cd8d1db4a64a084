//! Container error types for Scopestore.
//!
//! This module defines structured error types for backing container operations.

use thiserror::Error;

/// Errors that can occur inside a backing container.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Persisted data was written by an unsupported format version.
    #[error("Unsupported persistence version {version}; only version {supported} is supported")]
    UnsupportedVersion {
        /// The version found in the persisted data
        version: u8,
        /// The version this build can read
        supported: u8,
    },

    /// SQL operation failed.
    #[cfg(feature = "sqlite")]
    #[error("SQL error: {reason}")]
    Sqlx {
        /// Description of the failure, including context
        reason: String,
        /// The underlying sqlx error, when there is one
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl ContainerError {
    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ContainerError::FileIo { .. })
    }

    /// Check if this error is related to (de)serialization.
    pub fn is_serialization_error(&self) -> bool {
        matches!(
            self,
            ContainerError::SerializationFailed { .. }
                | ContainerError::DeserializationFailed { .. }
        )
    }

    /// Check if this error is about an unreadable persistence format.
    pub fn is_version_error(&self) -> bool {
        matches!(self, ContainerError::UnsupportedVersion { .. })
    }

    /// Check if this error came from the SQL layer.
    pub fn is_sql_error(&self) -> bool {
        #[cfg(feature = "sqlite")]
        {
            matches!(self, ContainerError::Sqlx { .. })
        }
        #[cfg(not(feature = "sqlite"))]
        {
            false
        }
    }
}

impl From<ContainerError> for crate::Error {
    fn from(err: ContainerError) -> Self {
        crate::Error::Container(err)
    }
}
