//! CVT Storage Crate
//!
//! Hash store backends and target registries for the current value table.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `redb` | ✅ | Persistent storage using redb |
//! | `memory` | ❌ | In-memory storage for testing |
//! | `all` | ❌ | All features |
//!
//! ## Example
//!
//! ```rust,no_run
//! use cvt_storage::{backends::create_backend, StoreTargetRegistry};
//! use cvt_core::TargetRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = create_backend("redb", &serde_json::json!({ "path": "./data/cvt.redb" }))?;
//! let targets = StoreTargetRegistry::new(store.clone());
//! targets.register("DEFAULT", "INST")?;
//! assert_eq!(targets.names("DEFAULT")?, vec!["INST"]);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod targets;

pub use backends::{available_backends, create_backend};
#[cfg(feature = "redb")]
pub use backends::{RedbBackend, RedbBackendConfig};
#[cfg(feature = "memory")]
pub use backends::{MemoryBackend, MemoryBackendConfig};
pub use targets::{ScanTargetRegistry, StoreTargetRegistry, TargetRecord};

// Re-exports from core
pub use cvt_core::storage::{HashStore, StorageError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
