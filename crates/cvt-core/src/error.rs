//! Unified error handling for the current value table.
//!
//! Every fallible operation in the workspace returns [`Error`]. None of the
//! variants are retried internally; retry policy belongs to the caller.

use crate::storage::StorageError;

/// Unified error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value type token was not one of RAW, CONVERTED, FORMATTED,
    /// WITH_UNITS or (where writes are concerned) ALL.
    #[error("Unknown value type '{0}'")]
    UnknownValueType(String),

    /// The referenced packet has no live value blob.
    #[error("Packet '{target} {packet}' does not exist")]
    PacketNotFound { target: String, packet: String },

    /// The item's RAW key is absent from an existing blob.
    #[error("Item '{target} {packet} {item}' does not exist")]
    ItemNotFound {
        target: String,
        packet: String,
        item: String,
    },

    /// An item specifier did not split into TARGET__PACKET__ITEM__TYPE.
    #[error("Malformed item specifier '{0}'")]
    MalformedSpecifier(String),

    /// Backing store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Blob encoding or decoding failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration load or parse failure.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::PacketNotFound`].
    pub fn packet_not_found(target: &str, packet: &str) -> Self {
        Error::PacketNotFound {
            target: target.to_string(),
            packet: packet.to_string(),
        }
    }

    /// Shorthand for [`Error::ItemNotFound`].
    pub fn item_not_found(target: &str, packet: &str, item: &str) -> Self {
        Error::ItemNotFound {
            target: target.to_string(),
            packet: packet.to_string(),
            item: item.to_string(),
        }
    }

    /// Whether the error means "nothing stored there" rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PacketNotFound { .. } | Error::ItemNotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
