//! Hash store backend implementations.
//!
//! This module contains implementations of the `HashStore` trait for
//! various storage engines, feature-gated for conditional compilation.

use std::sync::Arc;

use cvt_core::storage::{HashStore, Result, StorageError};
use serde_json::Value;

// Redb backend (feature-gated)
#[cfg(feature = "redb")]
pub mod redb;

// Memory backend (feature-gated)
#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redb")]
pub use self::redb::{RedbBackend, RedbBackendConfig};

#[cfg(feature = "memory")]
pub use self::memory::{MemoryBackend, MemoryBackendConfig};

/// Create a hash store by type identifier.
///
/// # Example
/// ```no_run
/// use cvt_storage::backends::create_backend;
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = create_backend("redb", &json!({ "path": "./data/cvt.redb" }))?;
/// assert!(store.is_persistent());
/// # Ok(())
/// # }
/// ```
pub fn create_backend(backend_type: &str, config: &Value) -> Result<Arc<dyn HashStore>> {
    match backend_type {
        #[cfg(feature = "redb")]
        "redb" => {
            let cfg: RedbBackendConfig = serde_json::from_value(config.clone())
                .map_err(|e| StorageError::Configuration(format!("Invalid redb config: {}", e)))?;
            Ok(Arc::new(RedbBackend::new(cfg)?))
        }

        #[cfg(feature = "memory")]
        "memory" => {
            let cfg: MemoryBackendConfig = serde_json::from_value(config.clone()).map_err(|e| {
                StorageError::Configuration(format!("Invalid memory config: {}", e))
            })?;
            Ok(Arc::new(MemoryBackend::new(cfg)))
        }

        _ => Err(StorageError::Configuration(format!(
            "Unknown backend type: {}. Available backends: {}",
            backend_type,
            available_backends().join(", ")
        ))),
    }
}

/// Get list of available backend types (based on enabled features).
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();
    #[cfg(feature = "redb")]
    backends.push("redb");
    #[cfg(feature = "memory")]
    backends.push("memory");
    backends
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_backends() {
        let backends = available_backends();
        assert!(!backends.is_empty());
    }

    #[test]
    fn test_create_backend_unknown() {
        let result = create_backend("unknown", &serde_json::json!({}));
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[cfg(feature = "memory")]
    #[test]
    fn test_create_memory_backend() {
        let backend = create_backend("memory", &serde_json::json!({})).unwrap();
        assert!(!backend.is_persistent());
    }

    #[cfg(feature = "redb")]
    #[test]
    fn test_create_redb_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cvt.redb");
        let backend = create_backend(
            "redb",
            &serde_json::json!({ "path": path.to_string_lossy(), "cache_capacity": 0 }),
        )
        .unwrap();
        assert!(backend.is_persistent());
        assert!(path.exists());
    }

    #[cfg(feature = "redb")]
    #[test]
    fn test_create_redb_backend_requires_path() {
        let result = create_backend("redb", &serde_json::json!({}));
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}
