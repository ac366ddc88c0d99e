//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cvt_core::storage::Result;
use cvt_core::{HashStore, ItemValue, StaticTargetRegistry};
use cvt_engine::{CvtEngine, ItemRecord, PacketValueSet};
use cvt_storage::MemoryBackend;

pub const SCOPE: &str = "DEFAULT";

/// Wraps a memory backend and counts field reads per key prefix.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryBackend,
    live_reads: AtomicUsize,
    override_reads: AtomicUsize,
}

impl CountingStore {
    pub fn live_reads(&self) -> usize {
        self.live_reads.load(Ordering::SeqCst)
    }

    pub fn override_reads(&self) -> usize {
        self.override_reads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.live_reads.store(0, Ordering::SeqCst);
        self.override_reads.store(0, Ordering::SeqCst);
    }
}

impl HashStore for CountingStore {
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        if key.contains("__tlm__") {
            self.live_reads.fetch_add(1, Ordering::SeqCst);
        } else if key.contains("__override__") {
            self.override_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.hget(key, field)
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<()> {
        self.inner.hset(key, field, value)
    }

    fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.inner.hdel(key, field)
    }

    fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        self.inner.hgetall(key)
    }

    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.scan_keys(prefix)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Engine over a fresh counting store, with `INST` and `SYSTEM` registered.
pub fn counting_engine() -> (CvtEngine, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    let engine = CvtEngine::new(
        store.clone(),
        Arc::new(StaticTargetRegistry::new(["INST", "SYSTEM"])),
    );
    (engine, store)
}

pub fn engine() -> CvtEngine {
    counting_engine().0
}

/// Packet set with a receipt time and the given items.
pub fn packet(received: f64, items: Vec<(&str, ItemRecord)>) -> PacketValueSet {
    let mut values: PacketValueSet = items
        .into_iter()
        .map(|(name, record)| (name.to_string(), record))
        .collect();
    values.insert(
        cvt_core::keys::RECEIVED_TIMESECONDS,
        ItemRecord::new(ItemValue::Float(received)),
    );
    values
}

pub fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
