//! Store-backed target registries.
//!
//! - [`StoreTargetRegistry`]: explicit registration, one hash per scope
//! - [`ScanTargetRegistry`]: derives targets from existing table keys

use std::collections::BTreeSet;
use std::sync::Arc;

use cvt_core::keys;
use cvt_core::{HashStore, Result, TargetRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Metadata stored for a registered target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub name: String,
    /// Registration time (unix millis).
    pub registered_at: i64,
}

/// Targets registered explicitly under `{scope}__cvt_targets`.
#[derive(Clone)]
pub struct StoreTargetRegistry {
    store: Arc<dyn HashStore>,
}

impl StoreTargetRegistry {
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self { store }
    }

    /// Register a target in a scope. Re-registering refreshes the record.
    pub fn register(&self, scope: &str, name: &str) -> Result<TargetRecord> {
        let record = TargetRecord {
            name: name.to_string(),
            registered_at: chrono::Utc::now().timestamp_millis(),
        };
        let blob = serde_json::to_vec(&record)?;
        self.store.hset(&keys::targets_key(scope), name, &blob)?;
        info!(category = "targets", scope = %scope, target = %name, "Target registered");
        Ok(record)
    }

    /// Remove a target from a scope. Returns whether it was registered.
    pub fn unregister(&self, scope: &str, name: &str) -> Result<bool> {
        let removed = self.store.hdel(&keys::targets_key(scope), name)?;
        if removed {
            info!(category = "targets", scope = %scope, target = %name, "Target unregistered");
        }
        Ok(removed)
    }

    /// Full records for every registered target, sorted by name.
    pub fn records(&self, scope: &str) -> Result<Vec<TargetRecord>> {
        let mut records = self
            .store
            .hgetall(&keys::targets_key(scope))?
            .into_values()
            .map(|blob| serde_json::from_slice::<TargetRecord>(&blob))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

impl TargetRegistry for StoreTargetRegistry {
    fn names(&self, scope: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .hgetall(&keys::targets_key(scope))?
            .into_keys()
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Targets inferred from the live and override tables present in a scope.
#[derive(Clone)]
pub struct ScanTargetRegistry {
    store: Arc<dyn HashStore>,
}

impl ScanTargetRegistry {
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self { store }
    }
}

impl TargetRegistry for ScanTargetRegistry {
    fn names(&self, scope: &str) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for prefix in [keys::tlm_prefix(scope), keys::override_prefix(scope)] {
            for key in self.store.scan_keys(&prefix)? {
                if let Some(target) = key.strip_prefix(prefix.as_str()) {
                    if !target.is_empty() {
                        names.insert(target.to_string());
                    }
                }
            }
        }
        debug!(category = "targets", scope = %scope, count = names.len(), "Scanned targets");
        Ok(names.into_iter().collect())
    }
}
