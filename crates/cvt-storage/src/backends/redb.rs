//! Redb hash store implementation.
//!
//! Provides persistent storage using the redb embedded database. All hashes
//! share one table keyed by `(hash key, field)`, so a full-hash read is a
//! single ordered range scan.

use std::collections::HashMap;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cvt_core::storage::{HashStore, Result, StorageError};
use lru::LruCache;
use parking_lot::Mutex;
use redb::{Database, TableDefinition};

const HASH_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("cvt_hashes");

// Default cache capacity - number of fields
const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Configuration for RedbBackend.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct RedbBackendConfig {
    /// Path to the database file.
    pub path: String,

    /// Create parent directories if they don't exist.
    #[serde(default = "default_create_dirs")]
    pub create_dirs: bool,

    /// LRU cache capacity (number of fields). 0 to disable caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_create_dirs() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl RedbBackendConfig {
    /// Create a new config with the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Set whether to create parent directories.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Create a config for a throwaway database.
    pub fn memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            create_dirs: false,
            cache_capacity: 512,
        }
    }
}

fn backend_err(e: impl Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

type FieldCache = Mutex<LruCache<(String, String), Vec<u8>>>;

/// redb-based persistent hash store with optional LRU read cache.
pub struct RedbBackend {
    db: Arc<Database>,
    /// Storage path (":memory:" for a temporary database).
    path: String,
    /// Actual file path for temporary databases (for cleanup).
    temp_path: Option<PathBuf>,
    /// Write-through cache of recently read fields.
    cache: Option<FieldCache>,
}

impl RedbBackend {
    /// Create a new RedbBackend with the given configuration.
    pub fn new(config: RedbBackendConfig) -> Result<Self> {
        let path = &config.path;

        let (db, temp_path) = if path == ":memory:" {
            // redb has no purely in-memory mode here; use a temporary file.
            let temp_path = std::env::temp_dir().join(format!("cvt_{}.redb", uuid::Uuid::new_v4()));
            let db = Database::create(&temp_path).map_err(backend_err)?;
            (db, Some(temp_path))
        } else {
            let path_ref = Path::new(path);
            if config.create_dirs {
                if let Some(parent) = path_ref.parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let db = if path_ref.exists() {
                Database::open(path_ref).map_err(backend_err)?
            } else {
                Database::create(path_ref).map_err(backend_err)?
            };
            (db, None)
        };

        // Create the table up front so read transactions never see it missing.
        let txn = db.begin_write().map_err(backend_err)?;
        txn.open_table(HASH_TABLE).map_err(backend_err)?;
        txn.commit().map_err(backend_err)?;

        let cache = NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));

        tracing::debug!(
            category = "storage",
            path = %config.path,
            cache_capacity = config.cache_capacity,
            "Opened redb hash store"
        );

        Ok(Self {
            db: Arc::new(db),
            path: config.path,
            temp_path,
            cache,
        })
    }

    /// Open or create a redb backend at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(RedbBackendConfig::new(
            path.as_ref().to_string_lossy().to_string(),
        ))
    }

    /// Get the storage path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn cache_key(key: &str, field: &str) -> (String, String) {
        (key.to_string(), field.to_string())
    }

    fn read_field(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let t = txn.open_table(HASH_TABLE).map_err(backend_err)?;
        let data = t
            .get((key, field))
            .map_err(backend_err)?
            .map(|value| value.value().to_vec());
        Ok(data)
    }

    fn write_field(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut t = txn.open_table(HASH_TABLE).map_err(backend_err)?;
            t.insert((key, field), value).map_err(backend_err)?;
        }
        txn.commit().map_err(backend_err)
    }

    fn delete_field(&self, key: &str, field: &str) -> Result<bool> {
        let txn = self.db.begin_write().map_err(backend_err)?;
        let existed = {
            let mut t = txn.open_table(HASH_TABLE).map_err(backend_err)?;
            let existed = t.remove((key, field)).map_err(backend_err)?.is_some();
            existed
        };
        txn.commit().map_err(backend_err)?;
        Ok(existed)
    }
}

// The cache lock is held across the database access on every cached path, so
// a read-miss fill can never interleave with a commit and resurrect old data.
impl HashStore for RedbBackend {
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let Some(cache) = &self.cache else {
            return self.read_field(key, field);
        };

        let mut cache = cache.lock();
        let cache_key = Self::cache_key(key, field);
        if let Some(cached) = cache.get(&cache_key) {
            return Ok(Some(cached.clone()));
        }
        let data = self.read_field(key, field)?;
        if let Some(data) = &data {
            cache.put(cache_key, data.clone());
        }
        Ok(data)
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        let Some(cache) = &self.cache else {
            return self.write_field(key, field, value);
        };

        let mut cache = cache.lock();
        self.write_field(key, field, value)?;
        cache.put(Self::cache_key(key, field), value.to_vec());
        Ok(())
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let Some(cache) = &self.cache else {
            return self.delete_field(key, field);
        };

        let mut cache = cache.lock();
        let existed = self.delete_field(key, field)?;
        cache.pop(&Self::cache_key(key, field));
        Ok(existed)
    }

    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let t = txn.open_table(HASH_TABLE).map_err(backend_err)?;

        let mut fields = HashMap::new();
        for entry in t.range((key, "")..).map_err(backend_err)? {
            let (k, v) = entry.map_err(backend_err)?;
            let (hash_key, field) = k.value();
            if hash_key != key {
                break;
            }
            fields.insert(field.to_string(), v.value().to_vec());
        }
        Ok(fields)
    }

    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let txn = self.db.begin_read().map_err(backend_err)?;
        let t = txn.open_table(HASH_TABLE).map_err(backend_err)?;

        let mut keys: Vec<String> = Vec::new();
        for entry in t.range((prefix, "")..).map_err(backend_err)? {
            let (k, _) = entry.map_err(backend_err)?;
            let (hash_key, _) = k.value();
            if !hash_key.starts_with(prefix) {
                break;
            }
            if keys.last().map(String::as_str) != Some(hash_key) {
                keys.push(hash_key.to_string());
            }
        }
        Ok(keys)
    }

    fn is_persistent(&self) -> bool {
        self.temp_path.is_none()
    }
}

/// Cleanup temporary database file when RedbBackend is dropped.
impl Drop for RedbBackend {
    fn drop(&mut self) {
        if let Some(temp_path) = &self.temp_path {
            if let Err(e) = std::fs::remove_file(temp_path) {
                tracing::debug!(
                    "Failed to remove temporary database file {}: {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}
