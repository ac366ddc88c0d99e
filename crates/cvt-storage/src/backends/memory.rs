//! In-memory hash store.
//!
//! Provides non-persistent storage for testing and embedding.

use std::collections::HashMap;

use cvt_core::storage::{HashStore, Result};
use parking_lot::RwLock;

/// Configuration for MemoryBackend.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct MemoryBackendConfig {
    /// Initial capacity hint (number of hash keys).
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl MemoryBackendConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self { capacity: None }
    }

    /// Set initial capacity hint.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// In-memory hash store: key -> (field -> blob).
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    pub fn new(config: MemoryBackendConfig) -> Self {
        let data = match config.capacity {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };
        Self {
            data: RwLock::new(data),
        }
    }

    /// Number of fields stored under a key.
    pub fn field_count(&self, key: &str) -> usize {
        self.data.read().get(key).map_or(0, HashMap::len)
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl HashStore for MemoryBackend {
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).and_then(|h| h.get(field)).cloned())
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        self.data
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_vec());
        Ok(())
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let mut data = self.data.write();
        let Some(hash) = data.get_mut(key) else {
            return Ok(false);
        };
        let removed = hash.remove(field).is_some();
        // Redis drops a hash once its last field is gone.
        if hash.is_empty() {
            data.remove(key);
        }
        Ok(removed)
    }

    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        Ok(self.data.read().get(key).cloned().unwrap_or_default())
    }

    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
