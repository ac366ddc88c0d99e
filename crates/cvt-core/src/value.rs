//! Telemetry value model.
//!
//! - [`ItemValue`]: one decoded value as stored in a packet blob
//! - [`ValueType`]: the four representations an item can be read in
//! - [`ValueTypeSet`]: a write/normalize selector, either one type or ALL
//! - [`LimitsState`]: the limits token recorded alongside an item

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A single telemetry value.
///
/// Integers and floats are kept apart so that `5` and `5.0` survive a round
/// trip through the store unchanged. Floats may be non-finite.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<ItemValue>),
    Object(BTreeMap<String, ItemValue>),
}

impl ItemValue {
    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ItemValue::Int(i) => Some(*i as f64),
            ItemValue::UInt(u) => Some(*u as f64),
            ItemValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view of the value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ItemValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ItemValue::Null)
    }

    /// Convert to the string form used for FORMATTED and WITH_UNITS.
    ///
    /// Strings are returned unchanged; everything else goes through
    /// [`Display`](fmt::Display).
    pub fn stringify(&self) -> ItemValue {
        match self {
            ItemValue::String(_) => self.clone(),
            other => ItemValue::String(other.to_string()),
        }
    }

    /// Debug-style rendering used for elements nested inside arrays and
    /// objects: strings are quoted and null reads as `nil`.
    fn inspect(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Null => write!(f, "nil"),
            ItemValue::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return write!(f, "NaN");
    }
    if value.is_infinite() {
        return write!(f, "{}", if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Scientific form with a fractional mantissa and a signed two-digit exponent.
        let sci = format!("{:e}", value);
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        if mantissa.contains('.') {
            write!(f, "{}e{}{:02}", mantissa, sign, exponent.abs())
        } else {
            write!(f, "{}.0e{}{:02}", mantissa, sign, exponent.abs())
        }
    } else if value.fract() == 0.0 {
        write!(f, "{:.1}", value)
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Null => Ok(()),
            ItemValue::Bool(b) => write!(f, "{}", b),
            ItemValue::Int(i) => write!(f, "{}", i),
            ItemValue::UInt(u) => write!(f, "{}", u),
            ItemValue::Float(x) => write_float(f, *x),
            ItemValue::String(s) => f.write_str(s),
            ItemValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.inspect(f)?;
                }
                f.write_str("]")
            }
            ItemValue::Object(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?} => ", key)?;
                    item.inspect(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for ItemValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ItemValue::Null => serializer.serialize_unit(),
            ItemValue::Bool(b) => serializer.serialize_bool(*b),
            ItemValue::Int(i) => serializer.serialize_i64(*i),
            ItemValue::UInt(u) => serializer.serialize_u64(*u),
            ItemValue::Float(x) => serializer.serialize_f64(*x),
            ItemValue::String(s) => serializer.serialize_str(s),
            ItemValue::Array(items) => items.serialize(serializer),
            ItemValue::Object(map) => map.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for ItemValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ItemValue::Null,
            serde_json::Value::Bool(b) => ItemValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ItemValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ItemValue::UInt(u)
                } else {
                    ItemValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => ItemValue::String(s),
            serde_json::Value::Array(items) => {
                ItemValue::Array(items.into_iter().map(ItemValue::from).collect())
            }
            serde_json::Value::Object(map) => ItemValue::Object(
                map.into_iter().map(|(k, v)| (k, ItemValue::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for ItemValue {
    fn from(b: bool) -> Self {
        ItemValue::Bool(b)
    }
}

impl From<i32> for ItemValue {
    fn from(i: i32) -> Self {
        ItemValue::Int(i64::from(i))
    }
}

impl From<i64> for ItemValue {
    fn from(i: i64) -> Self {
        ItemValue::Int(i)
    }
}

impl From<u64> for ItemValue {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => ItemValue::Int(i),
            Err(_) => ItemValue::UInt(u),
        }
    }
}

impl From<f64> for ItemValue {
    fn from(f: f64) -> Self {
        ItemValue::Float(f)
    }
}

impl From<&str> for ItemValue {
    fn from(s: &str) -> Self {
        ItemValue::String(s.to_string())
    }
}

impl From<String> for ItemValue {
    fn from(s: String) -> Self {
        ItemValue::String(s)
    }
}

impl From<Vec<ItemValue>> for ItemValue {
    fn from(items: Vec<ItemValue>) -> Self {
        ItemValue::Array(items)
    }
}

/// Representation an item can be read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Raw,
    Converted,
    Formatted,
    WithUnits,
}

impl ValueType {
    /// Every representation, least to most processed.
    pub const ALL: [ValueType; 4] = [
        ValueType::Raw,
        ValueType::Converted,
        ValueType::Formatted,
        ValueType::WithUnits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Raw => "RAW",
            ValueType::Converted => "CONVERTED",
            ValueType::Formatted => "FORMATTED",
            ValueType::WithUnits => "WITH_UNITS",
        }
    }

    /// Key suffix appended to the item name in a flattened blob.
    pub fn suffix(&self) -> &'static str {
        match self {
            ValueType::Raw => "",
            ValueType::Converted => "__C",
            ValueType::Formatted => "__F",
            ValueType::WithUnits => "__U",
        }
    }

    /// Representations tried, most specific first, when reading this type.
    /// Always terminates at RAW.
    pub fn fallback_chain(&self) -> &'static [ValueType] {
        match self {
            ValueType::Raw => &[ValueType::Raw],
            ValueType::Converted => &[ValueType::Converted, ValueType::Raw],
            ValueType::Formatted => &[ValueType::Formatted, ValueType::Converted, ValueType::Raw],
            ValueType::WithUnits => &[
                ValueType::WithUnits,
                ValueType::Formatted,
                ValueType::Converted,
                ValueType::Raw,
            ],
        }
    }

    /// FORMATTED and WITH_UNITS values are always strings.
    pub fn is_textual(&self) -> bool {
        matches!(self, ValueType::Formatted | ValueType::WithUnits)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RAW" => Ok(ValueType::Raw),
            "CONVERTED" => Ok(ValueType::Converted),
            "FORMATTED" => Ok(ValueType::Formatted),
            "WITH_UNITS" => Ok(ValueType::WithUnits),
            other => Err(Error::UnknownValueType(other.to_string())),
        }
    }
}

/// Selector for operations that touch one representation or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueTypeSet {
    #[default]
    All,
    Only(ValueType),
}

impl ValueTypeSet {
    /// The representations selected.
    pub fn types(&self) -> &'static [ValueType] {
        match self {
            ValueTypeSet::All => &ValueType::ALL,
            ValueTypeSet::Only(ValueType::Raw) => &[ValueType::Raw],
            ValueTypeSet::Only(ValueType::Converted) => &[ValueType::Converted],
            ValueTypeSet::Only(ValueType::Formatted) => &[ValueType::Formatted],
            ValueTypeSet::Only(ValueType::WithUnits) => &[ValueType::WithUnits],
        }
    }
}

impl From<ValueType> for ValueTypeSet {
    fn from(value_type: ValueType) -> Self {
        ValueTypeSet::Only(value_type)
    }
}

impl fmt::Display for ValueTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTypeSet::All => f.write_str("ALL"),
            ValueTypeSet::Only(value_type) => value_type.fmt(f),
        }
    }
}

impl FromStr for ValueTypeSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            Ok(ValueTypeSet::All)
        } else {
            s.parse().map(ValueTypeSet::Only)
        }
    }
}

/// Limits state token stored under an item's `__L` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LimitsState {
    Green,
    GreenLow,
    GreenHigh,
    Yellow,
    YellowLow,
    YellowHigh,
    Red,
    RedLow,
    RedHigh,
    Blue,
    /// The packet's receipt time is older than the caller's threshold.
    Stale,
    /// Any token this crate does not know, kept verbatim.
    Other(String),
}

impl LimitsState {
    pub fn as_str(&self) -> &str {
        match self {
            LimitsState::Green => "GREEN",
            LimitsState::GreenLow => "GREEN_LOW",
            LimitsState::GreenHigh => "GREEN_HIGH",
            LimitsState::Yellow => "YELLOW",
            LimitsState::YellowLow => "YELLOW_LOW",
            LimitsState::YellowHigh => "YELLOW_HIGH",
            LimitsState::Red => "RED",
            LimitsState::RedLow => "RED_LOW",
            LimitsState::RedHigh => "RED_HIGH",
            LimitsState::Blue => "BLUE",
            LimitsState::Stale => "STALE",
            LimitsState::Other(token) => token,
        }
    }
}

impl From<&str> for LimitsState {
    fn from(token: &str) -> Self {
        match token {
            "GREEN" => LimitsState::Green,
            "GREEN_LOW" => LimitsState::GreenLow,
            "GREEN_HIGH" => LimitsState::GreenHigh,
            "YELLOW" => LimitsState::Yellow,
            "YELLOW_LOW" => LimitsState::YellowLow,
            "YELLOW_HIGH" => LimitsState::YellowHigh,
            "RED" => LimitsState::Red,
            "RED_LOW" => LimitsState::RedLow,
            "RED_HIGH" => LimitsState::RedHigh,
            "BLUE" => LimitsState::Blue,
            "STALE" => LimitsState::Stale,
            other => LimitsState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for LimitsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LimitsState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LimitsState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(LimitsState::from(token.as_str()))
    }
}
