//! Core storage abstractions for the current value table.
//!
//! The engine talks to its backing store exclusively through [`HashStore`],
//! a Redis-style hash interface: every key holds a map of fields to opaque
//! serialized blobs.

use std::collections::HashMap;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Other error.
    #[error("Storage error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Hash-oriented key-value store.
///
/// Implementations must be safe for many concurrent readers and writers.
/// No operation spans more than one `(key, field)` pair, so backends never
/// need multi-key transactions.
pub trait HashStore: Send + Sync {
    /// Read one field of a hash.
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Write one field of a hash, replacing any previous blob.
    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()>;

    /// Delete one field of a hash. Returns whether the field existed.
    fn hdel(&self, key: &str, field: &str) -> Result<bool>;

    /// Read every field of a hash. A missing key yields an empty map.
    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>>;

    /// List every hash key starting with `prefix`.
    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if this backend survives a process restart.
    fn is_persistent(&self) -> bool;
}
