//! CVT Engine
//!
//! The current value table: latest decoded value of every telemetry item,
//! operator overrides, and batched multi-item lookups.
//!
//! ## Modules
//!
//! - [`cvt`]: whole-packet and single-item reads and writes
//! - [`overrides`]: forced values that shadow the live table
//! - [`batch`]: `get_tlm_values`, one store read per packet per batch
//! - [`packet`]: structured per-item value sets
//! - [`specifier`]: `TARGET__PACKET__ITEM__TYPE` parsing
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cvt_core::{HashStore, StaticTargetRegistry, ValueType};
//! use cvt_engine::{CvtEngine, ItemRecord, PacketValueSet};
//!
//! # fn example(store: Arc<dyn HashStore>) -> cvt_core::Result<()> {
//! let engine = CvtEngine::new(store, Arc::new(StaticTargetRegistry::new(["INST"])));
//!
//! let mut values = PacketValueSet::new();
//! values.insert("TEMP1", ItemRecord::new(1000).with_converted(25.5));
//! engine.set(&values, "INST", "HEALTH_STATUS", "DEFAULT")?;
//!
//! let temp = engine.get_item("INST", "HEALTH_STATUS", "TEMP1", ValueType::Converted, "DEFAULT")?;
//! let batch = engine.get_tlm_values(&["INST__HEALTH_STATUS__TEMP1__RAW"], 30.0, "DEFAULT")?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cvt;
pub mod overrides;
pub mod packet;
pub mod specifier;

pub use batch::TlmValue;
pub use cvt::CvtEngine;
pub use overrides::OverrideEntry;
pub use packet::{ItemRecord, PacketValueSet};
pub use specifier::ItemSpecifier;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
