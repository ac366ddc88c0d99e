//! Item specifiers: `TARGET__PACKET__ITEM__TYPE`.

use std::fmt;
use std::str::FromStr;

use cvt_core::keys;
use cvt_core::{Error, ValueType};

const SEPARATOR: &str = "__";

/// Fully qualified item plus the representation requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemSpecifier {
    pub target: String,
    pub packet: String,
    pub item: String,
    pub value_type: ValueType,
}

impl ItemSpecifier {
    pub fn new(
        target: impl Into<String>,
        packet: impl Into<String>,
        item: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            target: target.into(),
            packet: packet.into(),
            item: item.into(),
            value_type,
        }
    }

    /// Blob keys to try, most specific first, ending with the bare RAW key.
    pub fn lookup_keys(&self) -> Vec<String> {
        self.value_type
            .fallback_chain()
            .iter()
            .map(|&value_type| keys::item_key(&self.item, value_type))
            .collect()
    }
}

impl FromStr for ItemSpecifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [target, packet, item, value_type] = parts.as_slice() else {
            return Err(Error::MalformedSpecifier(s.to_string()));
        };
        if [target, packet, item].iter().any(|part| part.is_empty()) {
            return Err(Error::MalformedSpecifier(s.to_string()));
        }
        Ok(Self::new(*target, *packet, *item, value_type.parse()?))
    }
}

impl fmt::Display for ItemSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.target,
            self.packet,
            self.item,
            self.value_type,
            sep = SEPARATOR
        )
    }
}
