//! ormeta core - entity metadata engine
//!
//! Ties the workspace together:
//! - Loads declaration tables and override documents
//! - Resolves entities per mode into one shared repository
//! - Applies query hints against configured fetch defaults
//! - Renders results as serializable reports for the `ormeta` tool
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ormeta_core::{EngineConfig, MetadataEngine};
//! use ormeta_model::{DeclarationTable, ResolutionModes};
//!
//! let table = DeclarationTable::from_yaml_str(
//!     "types:\n  - name: shop.Order\n    directives: [entity]\n    fields:\n      - { name: id, type: long, directives: [id] }\n",
//! )
//! .unwrap();
//! let engine = MetadataEngine::new(Arc::new(table), EngineConfig::default());
//! engine
//!     .load_document("orm.yaml", "entities:\n  - class: shop.Order\n    table: { name: ORDERS }\n")
//!     .unwrap();
//!
//! let order = engine.resolve("shop.Order", ResolutionModes::ALL).unwrap().unwrap();
//! assert_eq!(order.table.unwrap().name.as_deref(), Some("ORDERS"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod report;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, MetadataEngine};
pub use error::{EngineError, Result};
pub use report::{HintReport, ResolutionReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{EngineConfig, EngineError, MetadataEngine};
    pub use ormeta_model::{EntityDescriptor, LifecycleEvent, ResolutionModes};
    pub use ormeta_parse::ResolverConfig;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
