//! Storage paths for scoped views.
//!
//! A [`StoragePath`] is a non-empty sequence of keys. The first key names the root
//! entry inside the backing container; every following key walks one level into
//! that entry's value.
//!
//! # Usage
//!
//! ```rust
//! use scopestore::StoragePath;
//! use std::str::FromStr;
//!
//! // Construct from a dotted string (empty components are dropped)
//! let path = StoragePath::from_str("app.settings.ui")?;
//! assert_eq!(path.root(), "app");
//! assert_eq!(path.nested(), ["settings", "ui"]);
//!
//! // Or build one level at a time
//! let path = StoragePath::root_only("app").child("settings").child("ui");
//! assert_eq!(path.to_string(), "app.settings.ui");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Error type for path validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// A path needs at least the root key.
    #[error("Storage path must contain at least one key")]
    Empty,
}

impl From<PathError> for crate::Error {
    fn from(err: PathError) -> Self {
        crate::Error::Path(err)
    }
}

/// An owned, non-empty key sequence locating a scope within a container.
///
/// Keys are stored verbatim. Only the [`FromStr`] constructor interprets dots as
/// separators, so keys added with [`StoragePath::child`] may contain any character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath {
    segments: Vec<String>,
}

impl StoragePath {
    /// Creates a path from a sequence of keys.
    ///
    /// # Errors
    /// Returns [`PathError::Empty`] if `segments` yields no keys.
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }

    /// Creates a depth-1 path addressing a whole root entry.
    pub fn root_only(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    /// The container key holding all data for this path and every path derived from it.
    pub fn root(&self) -> &str {
        // `segments` is never empty: every constructor rejects an empty key list
        &self.segments[0]
    }

    /// The keys below the root entry, possibly empty.
    pub fn nested(&self) -> &[String] {
        &self.segments[1..]
    }

    /// The keys below the root entry followed by `key`.
    ///
    /// This is the location a view at this path reads and writes for `key`.
    pub fn nested_with(&self, key: &str) -> Vec<String> {
        let mut target = Vec::with_capacity(self.segments.len());
        target.extend_from_slice(self.nested());
        target.push(key.to_string());
        target
    }

    /// All keys, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of keys in the path (at least 1).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True when this path addresses a whole root entry.
    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// The last key of the path.
    pub fn last(&self) -> &str {
        // `segments` is never empty
        &self.segments[self.segments.len() - 1]
    }

    /// Returns a new path with `key` appended.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }
}

impl FromStr for StoragePath {
    type Err = PathError;

    /// Parses a dotted path, dropping empty components (`".app..settings."` is `app.settings`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split('.').filter(|component| !component.is_empty()))
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl AsRef<[String]> for StoragePath {
    fn as_ref(&self) -> &[String] {
        &self.segments
    }
}
