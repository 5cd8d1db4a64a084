//! Constants used throughout the Scopestore library.

/// Key reported to change handlers when every key of a container changed at once,
/// e.g. when the container was cleared by another writer.
pub const ALL_KEYS: &str = "ALL_KEYS";

/// Default number of change events buffered per subscriber before it starts lagging.
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// The current persistence file format version for `InMemory` containers.
/// v0 indicates this is an unstable format subject to breaking changes.
pub const PERSISTENCE_VERSION: u8 = 0;
