//! Structured packet value sets.
//!
//! In the store a packet is a flat map whose keys carry representation
//! suffixes (`TEMP1`, `TEMP1__C`, `TEMP1__F`, `TEMP1__U`, `TEMP1__L`). Here the
//! same data is grouped per item into an [`ItemRecord`]; the flat form only
//! exists at the store boundary ([`PacketValueSet::to_blob`] /
//! [`PacketValueSet::from_blob`]).

use std::collections::BTreeMap;

use cvt_core::codec::{self, FlatMap};
use cvt_core::keys::{self, ItemField};
use cvt_core::{ItemValue, LimitsState, Result, ValueType};

/// Every stored representation of one item.
///
/// `raw` is optional because override sets may force only a richer
/// representation. Decoded packets always carry it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRecord {
    pub raw: Option<ItemValue>,
    pub converted: Option<ItemValue>,
    pub formatted: Option<ItemValue>,
    pub with_units: Option<ItemValue>,
    pub limits_state: Option<LimitsState>,
}

impl ItemRecord {
    /// Record holding only a RAW value.
    pub fn new(raw: impl Into<ItemValue>) -> Self {
        Self {
            raw: Some(raw.into()),
            ..Self::default()
        }
    }

    pub fn with_converted(mut self, value: impl Into<ItemValue>) -> Self {
        self.converted = Some(value.into());
        self
    }

    pub fn with_formatted(mut self, value: impl Into<String>) -> Self {
        self.formatted = Some(ItemValue::String(value.into()));
        self
    }

    pub fn with_units(mut self, value: impl Into<String>) -> Self {
        self.with_units = Some(ItemValue::String(value.into()));
        self
    }

    pub fn with_limits_state(mut self, state: LimitsState) -> Self {
        self.limits_state = Some(state);
        self
    }

    /// Stored value for exactly this representation, without fallback.
    pub fn get(&self, value_type: ValueType) -> Option<&ItemValue> {
        match value_type {
            ValueType::Raw => self.raw.as_ref(),
            ValueType::Converted => self.converted.as_ref(),
            ValueType::Formatted => self.formatted.as_ref(),
            ValueType::WithUnits => self.with_units.as_ref(),
        }
    }

    fn slot_mut(&mut self, value_type: ValueType) -> &mut Option<ItemValue> {
        match value_type {
            ValueType::Raw => &mut self.raw,
            ValueType::Converted => &mut self.converted,
            ValueType::Formatted => &mut self.formatted,
            ValueType::WithUnits => &mut self.with_units,
        }
    }

    /// Store a representation. FORMATTED and WITH_UNITS are stringified.
    pub fn set(&mut self, value_type: ValueType, value: ItemValue) {
        let value = if value_type.is_textual() {
            value.stringify()
        } else {
            value
        };
        *self.slot_mut(value_type) = Some(value);
    }

    /// Remove a representation, returning what was stored.
    pub fn clear(&mut self, value_type: ValueType) -> Option<ItemValue> {
        self.slot_mut(value_type).take()
    }

    /// Walk the fallback chain of `value_type` and return the first present
    /// representation along with the type it was found under.
    ///
    /// Presence is what counts: `0`, `false` and `null` are valid results.
    pub fn resolve(&self, value_type: ValueType) -> Option<(ValueType, &ItemValue)> {
        value_type
            .fallback_chain()
            .iter()
            .find_map(|&candidate| self.get(candidate).map(|value| (candidate, value)))
    }

    /// True when no representation and no limits state is stored.
    pub fn is_empty(&self) -> bool {
        ValueType::ALL.iter().all(|&t| self.get(t).is_none()) && self.limits_state.is_none()
    }

    fn flatten_into(&self, name: &str, flat: &mut FlatMap) {
        for value_type in ValueType::ALL {
            if let Some(value) = self.get(value_type) {
                flat.insert(keys::item_key(name, value_type), value.clone());
            }
        }
        if let Some(state) = &self.limits_state {
            flat.insert(keys::limits_key(name), ItemValue::from(state.as_str()));
        }
    }
}

/// Latest values of every item in one packet (or the overrides of one packet).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketValueSet {
    items: BTreeMap<String, ItemRecord>,
}

impl PacketValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat suffixed map into item records.
    pub fn from_flat(flat: FlatMap) -> Self {
        let mut set = Self::new();
        for (key, value) in flat {
            let (name, field) = keys::split_item_key(&key);
            let record = set.entry(name);
            match field {
                ItemField::Value(value_type) => *record.slot_mut(value_type) = Some(value),
                ItemField::Limits => {
                    record.limits_state = match &value {
                        ItemValue::Null => None,
                        ItemValue::String(token) => Some(LimitsState::from(token.as_str())),
                        other => Some(LimitsState::Other(other.to_string())),
                    }
                }
            }
        }
        set
    }

    /// Flatten back into suffixed keys.
    pub fn to_flat(&self) -> FlatMap {
        let mut flat = FlatMap::new();
        for (name, record) in &self.items {
            record.flatten_into(name, &mut flat);
        }
        flat
    }

    /// Decode a stored blob.
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        codec::decode_map(blob).map(Self::from_flat)
    }

    /// Encode for storage. Non-finite floats are preserved.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        codec::encode_map(&self.to_flat())
    }

    pub fn item(&self, name: &str) -> Option<&ItemRecord> {
        self.items.get(name)
    }

    pub fn item_mut(&mut self, name: &str) -> Option<&mut ItemRecord> {
        self.items.get_mut(name)
    }

    /// Record for `name`, created empty if missing.
    pub fn entry(&mut self, name: &str) -> &mut ItemRecord {
        self.items.entry(name.to_string()).or_default()
    }

    pub fn insert(&mut self, name: impl Into<String>, record: ItemRecord) -> Option<ItemRecord> {
        self.items.insert(name.into(), record)
    }

    pub fn remove(&mut self, name: &str) -> Option<ItemRecord> {
        self.items.remove(name)
    }

    /// Remove one representation of an item, dropping the record once it is
    /// empty.
    pub fn clear_value(&mut self, name: &str, value_type: ValueType) -> Option<ItemValue> {
        let record = self.items.get_mut(name)?;
        let removed = record.clear(value_type);
        if record.is_empty() {
            self.items.remove(name);
        }
        removed
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &ItemRecord)> {
        self.items.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Receipt time of the packet in seconds since the Unix epoch.
    pub fn received_time(&self) -> Option<f64> {
        self.item(keys::RECEIVED_TIMESECONDS)
            .and_then(|record| record.raw.as_ref())
            .and_then(ItemValue::as_f64)
    }
}

impl FromIterator<(String, ItemRecord)> for PacketValueSet {
    fn from_iter<I: IntoIterator<Item = (String, ItemRecord)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(entries: &[(&str, ItemValue)]) -> FlatMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_flat_groups_by_item() {
        let set = PacketValueSet::from_flat(flat(&[
            ("TEMP1", ItemValue::Int(1000)),
            ("TEMP1__C", ItemValue::Float(25.5)),
            ("TEMP1__F", ItemValue::from("25.500")),
            ("TEMP1__U", ItemValue::from("25.500 C")),
            ("TEMP1__L", ItemValue::from("YELLOW_HIGH")),
            ("COUNT", ItemValue::Int(7)),
        ]));

        assert_eq!(set.len(), 2);
        let temp = set.item("TEMP1").unwrap();
        assert_eq!(temp.raw, Some(ItemValue::Int(1000)));
        assert_eq!(temp.converted, Some(ItemValue::Float(25.5)));
        assert_eq!(temp.with_units, Some(ItemValue::from("25.500 C")));
        assert_eq!(temp.limits_state, Some(LimitsState::YellowHigh));
        assert_eq!(set.item("COUNT").unwrap(), &ItemRecord::new(7));
    }

    #[test]
    fn test_flat_round_trip_keeps_keys() {
        let original = flat(&[
            ("A", ItemValue::Int(0)),
            ("A__C", ItemValue::Bool(false)),
            ("B__F", ItemValue::from("only formatted")),
            ("C__L", ItemValue::from("RED")),
        ]);
        let set = PacketValueSet::from_flat(original.clone());
        assert_eq!(set.to_flat(), original);
    }

    #[test]
    fn test_non_string_limits_token_is_kept_as_text() {
        let set = PacketValueSet::from_flat(flat(&[("A__L", ItemValue::Int(3))]));
        assert_eq!(
            set.item("A").unwrap().limits_state,
            Some(LimitsState::Other("3".into()))
        );
    }

    #[test]
    fn test_null_limits_token_means_no_state() {
        let set = PacketValueSet::from_flat(flat(&[
            ("A", ItemValue::Int(1)),
            ("A__L", ItemValue::Null),
        ]));
        assert_eq!(set.item("A").unwrap().limits_state, None);
        // Rewriting the set drops the null token instead of turning it into "".
        assert_eq!(set.to_flat(), flat(&[("A", ItemValue::Int(1))]));
    }

    #[test]
    fn test_resolve_walks_chain_by_presence() {
        let record = ItemRecord::new(0).with_converted(false);
        assert_eq!(
            record.resolve(ValueType::WithUnits),
            Some((ValueType::Converted, &ItemValue::Bool(false)))
        );
        assert_eq!(
            record.resolve(ValueType::Raw),
            Some((ValueType::Raw, &ItemValue::Int(0)))
        );

        let empty = ItemRecord::default();
        assert_eq!(empty.resolve(ValueType::Formatted), None);
    }

    #[test]
    fn test_set_stringifies_textual_types() {
        let mut record = ItemRecord::default();
        record.set(ValueType::Formatted, ItemValue::Float(1.5));
        record.set(ValueType::WithUnits, ItemValue::Int(2));
        record.set(ValueType::Converted, ItemValue::Int(3));
        assert_eq!(record.formatted, Some(ItemValue::from("1.5")));
        assert_eq!(record.with_units, Some(ItemValue::from("2")));
        assert_eq!(record.converted, Some(ItemValue::Int(3)));
    }

    #[test]
    fn test_clear_value_drops_empty_records() {
        let mut set = PacketValueSet::new();
        set.insert("A", ItemRecord::new(1).with_converted(2));

        assert_eq!(set.clear_value("A", ValueType::Raw), Some(ItemValue::Int(1)));
        assert!(set.item("A").is_some());
        assert_eq!(set.clear_value("A", ValueType::Converted), Some(ItemValue::Int(2)));
        assert!(set.is_empty());
        assert_eq!(set.clear_value("A", ValueType::Raw), None);
    }

    #[test]
    fn test_blob_round_trip_with_nan() {
        let mut set = PacketValueSet::new();
        set.insert("X", ItemRecord::new(f64::NAN).with_converted(f64::INFINITY));
        set.insert(keys::RECEIVED_TIMESECONDS, ItemRecord::new(1_700_000_000.25));

        let decoded = PacketValueSet::from_blob(&set.to_blob().unwrap()).unwrap();
        let x = decoded.item("X").unwrap();
        assert!(x.raw.as_ref().and_then(ItemValue::as_f64).unwrap().is_nan());
        assert_eq!(x.converted, Some(ItemValue::Float(f64::INFINITY)));
        assert_eq!(decoded.received_time(), Some(1_700_000_000.25));
    }
}
