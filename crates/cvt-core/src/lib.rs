//! CVT Core
//!
//! Shared vocabulary for the current value table workspace:
//!
//! - [`value`]: telemetry values, value types and limits states
//! - [`codec`]: the NaN-tolerant JSON blob format
//! - [`keys`]: store key naming and item key suffixes
//! - [`storage`]: the [`HashStore`] trait every backend implements
//! - [`registry`]: the [`TargetRegistry`] trait for known targets
//! - [`config`]: TOML + environment configuration
//! - [`error`]: the unified [`Error`] type

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod registry;
pub mod storage;
pub mod value;

pub use codec::FlatMap;
pub use config::CvtConfig;
pub use error::{Error, Result};
pub use registry::{StaticTargetRegistry, TargetRegistry};
pub use storage::{HashStore, StorageError};
pub use value::{ItemValue, LimitsState, ValueType, ValueTypeSet};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
