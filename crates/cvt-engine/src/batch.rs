//! Batched item lookups.
//!
//! A batch reads each packet's override set and live blob at most once, no
//! matter how many of its items are requested. Caches live only for the
//! duration of one call. Any failure aborts the whole batch.

use std::collections::HashMap;

use cvt_core::{Error, ItemValue, LimitsState, Result};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::cvt::CvtEngine;
use crate::packet::PacketValueSet;
use crate::specifier::ItemSpecifier;

/// Result of one batched lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TlmValue {
    /// Forced by an override. Carries no limits state.
    Overridden(ItemValue),
    /// Read from the live table.
    Live {
        value: ItemValue,
        limits_state: Option<LimitsState>,
    },
}

impl TlmValue {
    pub fn value(&self) -> &ItemValue {
        match self {
            TlmValue::Overridden(value) | TlmValue::Live { value, .. } => value,
        }
    }

    pub fn limits_state(&self) -> Option<&LimitsState> {
        match self {
            TlmValue::Overridden(_) => None,
            TlmValue::Live { limits_state, .. } => limits_state.as_ref(),
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, TlmValue::Overridden(_))
    }

    /// `[value]` for overrides, `[value, state | null]` for live values.
    pub fn to_item_value(&self) -> ItemValue {
        match self {
            TlmValue::Overridden(value) => ItemValue::Array(vec![value.clone()]),
            TlmValue::Live {
                value,
                limits_state,
            } => ItemValue::Array(vec![
                value.clone(),
                limits_state
                    .as_ref()
                    .map(|state| ItemValue::from(state.as_str()))
                    .unwrap_or(ItemValue::Null),
            ]),
        }
    }
}

impl Serialize for TlmValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TlmValue::Overridden(value) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(value)?;
                seq.end()
            }
            TlmValue::Live {
                value,
                limits_state,
            } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(value)?;
                seq.serialize_element(limits_state)?;
                seq.end()
            }
        }
    }
}

type PacketId = (String, String);

fn packet_id(specifier: &ItemSpecifier) -> PacketId {
    (specifier.target.clone(), specifier.packet.clone())
}

/// A packet is stale when its receipt time is older than `stale_time`, or
/// when it carries no receipt time at all.
fn is_stale(values: &PacketValueSet, stale_time: f64, now: f64) -> bool {
    match values.received_time() {
        Some(received) => now - received > stale_time,
        None => true,
    }
}

impl CvtEngine {
    /// Resolve a list of `TARGET__PACKET__ITEM__TYPE` specifiers against the
    /// current time. The result is parallel to `items`.
    pub fn get_tlm_values<S: AsRef<str>>(
        &self,
        items: &[S],
        stale_time: f64,
        scope: &str,
    ) -> Result<Vec<TlmValue>> {
        let now = chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        self.get_tlm_values_at(items, stale_time, now, scope)
    }

    /// Same as [`get_tlm_values`](Self::get_tlm_values) with an explicit
    /// `now`, in seconds since the Unix epoch.
    pub fn get_tlm_values_at<S: AsRef<str>>(
        &self,
        items: &[S],
        stale_time: f64,
        now: f64,
        scope: &str,
    ) -> Result<Vec<TlmValue>> {
        let result = items
            .iter()
            .map(|item| item.as_ref().parse::<ItemSpecifier>())
            .collect::<Result<Vec<_>>>()
            .and_then(|specifiers| self.resolve_specifiers(&specifiers, stale_time, now, scope));

        match &result {
            Ok(values) => debug!(
                category = "batch",
                scope = %scope,
                requested = items.len(),
                overridden = values.iter().filter(|v| v.is_overridden()).count(),
                "Batch resolved"
            ),
            Err(e) => warn!(
                category = "batch",
                scope = %scope,
                requested = items.len(),
                error = %e,
                "Batch lookup failed"
            ),
        }
        result
    }

    /// Resolve already parsed specifiers. Overrides are applied first, then the
    /// remaining items are read from the live table.
    pub fn resolve_specifiers(
        &self,
        specifiers: &[ItemSpecifier],
        stale_time: f64,
        now: f64,
        scope: &str,
    ) -> Result<Vec<TlmValue>> {
        let mut override_cache: HashMap<PacketId, Option<PacketValueSet>> = HashMap::new();
        let mut resolved: Vec<Option<TlmValue>> = Vec::with_capacity(specifiers.len());

        for specifier in specifiers {
            let id = packet_id(specifier);
            if !override_cache.contains_key(&id) {
                let overrides = self.override_set(&specifier.target, &specifier.packet, scope)?;
                override_cache.insert(id.clone(), overrides);
            }
            let forced = override_cache[&id]
                .as_ref()
                .and_then(|overrides| overrides.item(&specifier.item))
                .and_then(|record| record.get(specifier.value_type))
                .cloned();
            resolved.push(forced.map(TlmValue::Overridden));
        }

        let mut live_cache: HashMap<PacketId, PacketValueSet> = HashMap::new();
        for (specifier, slot) in specifiers.iter().zip(resolved.iter_mut()) {
            if slot.is_some() {
                continue;
            }

            let id = packet_id(specifier);
            if !live_cache.contains_key(&id) {
                let values = self
                    .get(&specifier.target, &specifier.packet, scope)?
                    .ok_or_else(|| Error::packet_not_found(&specifier.target, &specifier.packet))?;
                live_cache.insert(id.clone(), values);
            }
            let values = &live_cache[&id];

            let record = values.item(&specifier.item);
            let value = record
                .and_then(|record| record.resolve(specifier.value_type))
                .map(|(_, value)| {
                    if specifier.value_type.is_textual() {
                        value.stringify()
                    } else {
                        value.clone()
                    }
                })
                .ok_or_else(|| Error::item_not_found(&specifier.target, &specifier.packet, &specifier.item))?;

            let limits_state = if is_stale(values, stale_time, now) {
                Some(LimitsState::Stale)
            } else {
                record.and_then(|record| record.limits_state.clone())
            };

            *slot = Some(TlmValue::Live {
                value,
                limits_state,
            });
        }

        Ok(resolved.into_iter().flatten().collect())
    }
}
