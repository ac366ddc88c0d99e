//! Override layer: operator-forced values that shadow live telemetry.
//!
//! Overrides live at `{scope}__override__{target}` with the packet name as the
//! field, using the same per-item layout as the live table. An override stays
//! until it is normalized away; live updates never touch it.

use std::collections::BTreeMap;

use cvt_core::keys;
use cvt_core::{ItemValue, Result, ValueType, ValueTypeSet};
use serde::Serialize;
use tracing::{debug, info};

use crate::cvt::CvtEngine;
use crate::packet::PacketValueSet;

/// One forced value, as reported by [`CvtEngine::overrides`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideEntry {
    pub target_name: String,
    pub packet_name: String,
    pub item_name: String,
    pub value_type: ValueType,
    pub value: ItemValue,
}

impl OverrideEntry {
    /// Entry as a plain value map, for callers that emit generic documents.
    pub fn to_item_value(&self) -> ItemValue {
        let mut map = BTreeMap::new();
        map.insert("target_name".to_string(), ItemValue::from(self.target_name.as_str()));
        map.insert("packet_name".to_string(), ItemValue::from(self.packet_name.as_str()));
        map.insert("item_name".to_string(), ItemValue::from(self.item_name.as_str()));
        map.insert("value_type".to_string(), ItemValue::from(self.value_type.as_str()));
        map.insert("value".to_string(), self.value.clone());
        ItemValue::Object(map)
    }
}

impl CvtEngine {
    /// Decoded override set of a packet, if any override exists for it.
    pub fn override_set(
        &self,
        target: &str,
        packet: &str,
        scope: &str,
    ) -> Result<Option<PacketValueSet>> {
        self.store
            .hget(&keys::override_key(scope, target), packet)?
            .map(|blob| PacketValueSet::from_blob(&blob))
            .transpose()
    }

    /// Force an item's value for the given representation(s).
    ///
    /// The packet's override set is created on first use. FORMATTED and
    /// WITH_UNITS are stored as strings.
    pub fn override_item(
        &self,
        target: &str,
        packet: &str,
        item: &str,
        value: ItemValue,
        types: ValueTypeSet,
        scope: &str,
    ) -> Result<()> {
        let mut overrides = self.override_set(target, packet, scope)?.unwrap_or_default();

        let record = overrides.entry(item);
        for &value_type in types.types() {
            record.set(value_type, value.clone());
        }

        self.store.hset(
            &keys::override_key(scope, target),
            packet,
            &overrides.to_blob()?,
        )?;
        info!(
            category = "override",
            scope = %scope,
            target = %target,
            packet = %packet,
            item = %item,
            types = %types,
            value = %value,
            "Item overridden"
        );
        Ok(())
    }

    /// Remove overrides of an item for the given representation(s).
    ///
    /// Once the packet has no overrides left its field is deleted. Returns
    /// whether anything was removed.
    pub fn normalize(
        &self,
        target: &str,
        packet: &str,
        item: &str,
        types: ValueTypeSet,
        scope: &str,
    ) -> Result<bool> {
        let Some(mut overrides) = self.override_set(target, packet, scope)? else {
            debug!(
                category = "override",
                scope = %scope,
                target = %target,
                packet = %packet,
                "No overrides to normalize"
            );
            return Ok(false);
        };

        let mut removed = false;
        for &value_type in types.types() {
            removed |= overrides.clear_value(item, value_type).is_some();
        }

        let key = keys::override_key(scope, target);
        if overrides.is_empty() {
            self.store.hdel(&key, packet)?;
        } else {
            self.store.hset(&key, packet, &overrides.to_blob()?)?;
        }

        info!(
            category = "override",
            scope = %scope,
            target = %target,
            packet = %packet,
            item = %item,
            types = %types,
            removed,
            "Item normalized"
        );
        Ok(removed)
    }

    /// Every override in a scope, across all targets known to the registry.
    ///
    /// Ordered by target, packet, item, then representation.
    pub fn overrides(&self, scope: &str) -> Result<Vec<OverrideEntry>> {
        let mut entries = Vec::new();
        for target in self.targets.names(scope)? {
            let packets: BTreeMap<String, Vec<u8>> = self
                .store
                .hgetall(&keys::override_key(scope, &target))?
                .into_iter()
                .collect();

            for (packet, blob) in packets {
                let overrides = PacketValueSet::from_blob(&blob)?;
                for (item, record) in overrides.items() {
                    for value_type in ValueType::ALL {
                        if let Some(value) = record.get(value_type) {
                            entries.push(OverrideEntry {
                                target_name: target.clone(),
                                packet_name: packet.clone(),
                                item_name: item.to_string(),
                                value_type,
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }
        debug!(category = "override", scope = %scope, count = entries.len(), "Listed overrides");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::packet::ItemRecord;
    use cvt_core::{HashStore, StaticTargetRegistry};
    use cvt_storage::MemoryBackend;

    fn engine(targets: &[&str]) -> (CvtEngine, Arc<MemoryBackend>) {
        let store = Arc::new(MemoryBackend::default());
        let engine = CvtEngine::new(
            store.clone(),
            Arc::new(StaticTargetRegistry::new(targets.iter().copied())),
        );
        (engine, store)
    }

    #[test]
    fn test_override_creates_set_lazily() {
        let (engine, _) = engine(&["INST"]);
        assert_eq!(engine.override_set("INST", "HEALTH_STATUS", "DEFAULT").unwrap(), None);

        engine
            .override_item(
                "INST",
                "HEALTH_STATUS",
                "TEMP1",
                ItemValue::Float(1.5),
                ValueTypeSet::Only(ValueType::Converted),
                "DEFAULT",
            )
            .unwrap();

        let set = engine.override_set("INST", "HEALTH_STATUS", "DEFAULT").unwrap().unwrap();
        assert_eq!(
            set.item("TEMP1"),
            Some(&ItemRecord::default().with_converted(1.5))
        );
    }

    #[test]
    fn test_override_all_stringifies_textual() {
        let (engine, _) = engine(&["INST"]);
        engine
            .override_item("INST", "P", "A", ItemValue::Int(10), ValueTypeSet::All, "DEFAULT")
            .unwrap();

        let set = engine.override_set("INST", "P", "DEFAULT").unwrap().unwrap();
        let record = set.item("A").unwrap();
        assert_eq!(record.raw, Some(ItemValue::Int(10)));
        assert_eq!(record.converted, Some(ItemValue::Int(10)));
        assert_eq!(record.formatted, Some(ItemValue::from("10")));
        assert_eq!(record.with_units, Some(ItemValue::from("10")));
    }

    #[test]
    fn test_normalize_deletes_empty_field() {
        let (engine, store) = engine(&["INST"]);
        engine
            .override_item(
                "INST",
                "P",
                "A",
                ItemValue::Int(1),
                ValueTypeSet::Only(ValueType::Raw),
                "DEFAULT",
            )
            .unwrap();
        engine
            .override_item(
                "INST",
                "P",
                "B",
                ItemValue::Int(2),
                ValueTypeSet::Only(ValueType::Raw),
                "DEFAULT",
            )
            .unwrap();

        assert!(engine.normalize("INST", "P", "A", ValueTypeSet::All, "DEFAULT").unwrap());
        assert!(store.hget("DEFAULT__override__INST", "P").unwrap().is_some());

        assert!(engine
            .normalize("INST", "P", "B", ValueTypeSet::Only(ValueType::Raw), "DEFAULT")
            .unwrap());
        assert_eq!(store.hget("DEFAULT__override__INST", "P").unwrap(), None);

        assert!(!engine.normalize("INST", "P", "B", ValueTypeSet::All, "DEFAULT").unwrap());
    }

    #[test]
    fn test_normalize_other_type_keeps_override() {
        let (engine, _) = engine(&["INST"]);
        engine
            .override_item(
                "INST",
                "P",
                "A",
                ItemValue::Int(1),
                ValueTypeSet::Only(ValueType::Raw),
                "DEFAULT",
            )
            .unwrap();
        assert!(!engine
            .normalize("INST", "P", "A", ValueTypeSet::Only(ValueType::Converted), "DEFAULT")
            .unwrap());
        assert!(engine.override_set("INST", "P", "DEFAULT").unwrap().is_some());
    }

    #[test]
    fn test_overrides_lists_registered_targets_only() {
        let (engine, _) = engine(&["INST", "INST2"]);
        engine
            .override_item(
                "INST",
                "P",
                "A",
                ItemValue::Int(1),
                ValueTypeSet::Only(ValueType::WithUnits),
                "DEFAULT",
            )
            .unwrap();
        engine
            .override_item(
                "INST2",
                "Q",
                "B",
                ItemValue::Bool(false),
                ValueTypeSet::Only(ValueType::Raw),
                "DEFAULT",
            )
            .unwrap();
        engine
            .override_item(
                "UNKNOWN",
                "Q",
                "C",
                ItemValue::Int(3),
                ValueTypeSet::All,
                "DEFAULT",
            )
            .unwrap();

        let entries = engine.overrides("DEFAULT").unwrap();
        assert_eq!(
            entries,
            vec![
                OverrideEntry {
                    target_name: "INST".into(),
                    packet_name: "P".into(),
                    item_name: "A".into(),
                    value_type: ValueType::WithUnits,
                    value: ItemValue::from("1"),
                },
                OverrideEntry {
                    target_name: "INST2".into(),
                    packet_name: "Q".into(),
                    item_name: "B".into(),
                    value_type: ValueType::Raw,
                    value: ItemValue::Bool(false),
                },
            ]
        );
        assert!(engine.overrides("OTHER").unwrap().is_empty());
    }

    #[test]
    fn test_entry_to_item_value() {
        let entry = OverrideEntry {
            target_name: "INST".into(),
            packet_name: "P".into(),
            item_name: "A".into(),
            value_type: ValueType::Converted,
            value: ItemValue::Float(2.5),
        };
        let ItemValue::Object(map) = entry.to_item_value() else {
            panic!("expected an object");
        };
        assert_eq!(map["value_type"], ItemValue::from("CONVERTED"));
        assert_eq!(map["value"], ItemValue::Float(2.5));
    }
}
