//! Store key naming.
//!
//! Live values live at `{scope}__tlm__{target}`, overrides at
//! `{scope}__override__{target}`; the hash field is the packet name. Inside a
//! blob, item keys carry a representation suffix (`__C`, `__F`, `__U`, `__L`).

use crate::value::ValueType;

const TLM_SEGMENT: &str = "__tlm__";
const OVERRIDE_SEGMENT: &str = "__override__";
const TARGETS_SEGMENT: &str = "__cvt_targets";

/// Suffix of the limits state key.
pub const LIMITS_SUFFIX: &str = "__L";

/// Item holding the packet's receipt time in seconds since the Unix epoch.
pub const RECEIVED_TIMESECONDS: &str = "RECEIVED_TIMESECONDS";

/// Hash key of the live value table for a target.
pub fn tlm_key(scope: &str, target: &str) -> String {
    format!("{}{}{}", scope, TLM_SEGMENT, target)
}

/// Hash key of the override table for a target.
pub fn override_key(scope: &str, target: &str) -> String {
    format!("{}{}{}", scope, OVERRIDE_SEGMENT, target)
}

/// Hash key of the target registry for a scope.
pub fn targets_key(scope: &str) -> String {
    format!("{}{}", scope, TARGETS_SEGMENT)
}

/// Prefix shared by every live value key of a scope.
pub fn tlm_prefix(scope: &str) -> String {
    format!("{}{}", scope, TLM_SEGMENT)
}

/// Prefix shared by every override key of a scope.
pub fn override_prefix(scope: &str) -> String {
    format!("{}{}", scope, OVERRIDE_SEGMENT)
}

/// Field a key addresses within one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Value(ValueType),
    Limits,
}

/// Blob key for one representation of an item.
pub fn item_key(item: &str, value_type: ValueType) -> String {
    let suffix = value_type.suffix();
    let mut key = String::with_capacity(item.len() + suffix.len());
    key.push_str(item);
    key.push_str(suffix);
    key
}

/// Blob key for an item's limits state.
pub fn limits_key(item: &str) -> String {
    format!("{}{}", item, LIMITS_SUFFIX)
}

/// Split a blob key into its item name and the field it addresses.
///
/// A key without a recognised suffix is the RAW value of an item with that
/// exact name.
pub fn split_item_key(key: &str) -> (&str, ItemField) {
    let suffixed = [
        ("__C", ItemField::Value(ValueType::Converted)),
        ("__F", ItemField::Value(ValueType::Formatted)),
        ("__U", ItemField::Value(ValueType::WithUnits)),
        (LIMITS_SUFFIX, ItemField::Limits),
    ];
    for (suffix, field) in suffixed {
        if let Some(name) = key.strip_suffix(suffix) {
            if !name.is_empty() {
                return (name, field);
            }
        }
    }
    (key, ItemField::Value(ValueType::Raw))
}
