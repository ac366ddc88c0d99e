//! Current value table reads and writes.
//!
//! Every method takes the tenant scope explicitly. The engine keeps no state
//! of its own between calls: it is a thin, synchronous layer over the
//! [`HashStore`].

use std::sync::Arc;

use cvt_core::keys;
use cvt_core::{Error, HashStore, ItemValue, Result, TargetRegistry, ValueType, ValueTypeSet};
use tracing::{debug, info, trace};

use crate::packet::PacketValueSet;

/// Current value table engine.
#[derive(Clone)]
pub struct CvtEngine {
    pub(crate) store: Arc<dyn HashStore>,
    pub(crate) targets: Arc<dyn TargetRegistry>,
}

impl CvtEngine {
    /// Create an engine over a store. `targets` is only consulted when
    /// listing overrides.
    pub fn new(store: Arc<dyn HashStore>, targets: Arc<dyn TargetRegistry>) -> Self {
        Self { store, targets }
    }

    pub fn store(&self) -> &Arc<dyn HashStore> {
        &self.store
    }

    /// Replace the whole value set of a packet.
    pub fn set(
        &self,
        values: &PacketValueSet,
        target: &str,
        packet: &str,
        scope: &str,
    ) -> Result<()> {
        let blob = values.to_blob()?;
        self.store.hset(&keys::tlm_key(scope, target), packet, &blob)?;
        trace!(
            category = "cvt",
            scope = %scope,
            target = %target,
            packet = %packet,
            items = values.len(),
            "Packet values replaced"
        );
        Ok(())
    }

    /// Update one item of an existing packet.
    ///
    /// With [`ValueTypeSet::All`] the same value is written to every
    /// representation; FORMATTED and WITH_UNITS always receive its string
    /// form. Concurrent writers to the same packet race: the last write wins.
    pub fn set_item(
        &self,
        target: &str,
        packet: &str,
        item: &str,
        value: ItemValue,
        types: ValueTypeSet,
        scope: &str,
    ) -> Result<()> {
        let mut values = self
            .get(target, packet, scope)?
            .ok_or_else(|| Error::packet_not_found(target, packet))?;

        let record = values.entry(item);
        for &value_type in types.types() {
            record.set(value_type, value.clone());
        }

        debug!(
            category = "cvt",
            scope = %scope,
            target = %target,
            packet = %packet,
            item = %item,
            types = %types,
            "Item value set"
        );
        self.set(&values, target, packet, scope)
    }

    /// Resolve one item in the requested representation.
    ///
    /// The override table is checked for the top-priority key only; on a hit
    /// the live table is never read. Otherwise the live packet is walked along
    /// the full fallback chain. Returns `None` when the packet exists but no
    /// key of the chain is present.
    pub fn get_item(
        &self,
        target: &str,
        packet: &str,
        item: &str,
        value_type: ValueType,
        scope: &str,
    ) -> Result<Option<ItemValue>> {
        if let Some(overrides) = self.override_set(target, packet, scope)? {
            if let Some(value) = overrides.item(item).and_then(|record| record.get(value_type)) {
                trace!(
                    category = "cvt",
                    scope = %scope,
                    target = %target,
                    packet = %packet,
                    item = %item,
                    "Item resolved from override"
                );
                return Ok(Some(value.clone()));
            }
        }

        let values = self
            .get(target, packet, scope)?
            .ok_or_else(|| Error::packet_not_found(target, packet))?;

        let resolved = values
            .item(item)
            .and_then(|record| record.resolve(value_type))
            .map(|(_, value)| {
                if value_type.is_textual() {
                    value.stringify()
                } else {
                    value.clone()
                }
            });
        Ok(resolved)
    }

    /// Whole decoded value set of a packet, if present.
    pub fn get(&self, target: &str, packet: &str, scope: &str) -> Result<Option<PacketValueSet>> {
        self.store
            .hget(&keys::tlm_key(scope, target), packet)?
            .map(|blob| PacketValueSet::from_blob(&blob))
            .transpose()
    }

    /// Packets of a target that currently have live values, sorted.
    pub fn packet_names(&self, target: &str, scope: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .hgetall(&keys::tlm_key(scope, target))?
            .into_keys()
            .collect();
        names.sort();
        Ok(names)
    }

    /// Remove a packet's value set. Returns whether it existed.
    pub fn del(&self, target: &str, packet: &str, scope: &str) -> Result<bool> {
        let removed = self.store.hdel(&keys::tlm_key(scope, target), packet)?;
        info!(
            category = "cvt",
            scope = %scope,
            target = %target,
            packet = %packet,
            removed,
            "Packet values deleted"
        );
        Ok(removed)
    }
}
