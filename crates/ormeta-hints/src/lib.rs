//! ormeta hint resolver
//!
//! Applies query hints to a fetch configuration.
//!
//! # Overview
//!
//! - **HintResolver**: classifies keys as supported, recognized or
//!   unrecognized and dispatches supported ones to typed setters
//! - **FetchConfiguration**: the settings hints write into, with lock modes
//!   deferred until a transaction is active
//! - **HintExtension**: product-specific keys and prefixes
//!
//! Aliases of one setting are ranked; a lower-precedence alias never
//! overwrites a value set through a higher one.
//!
//! # Example
//!
//! ```rust
//! use indexmap::IndexMap;
//! use ormeta_hints::{FetchConfiguration, HintResolver};
//! use serde_json::json;
//!
//! let resolver = HintResolver::default();
//! let mut hints = IndexMap::new();
//! hints.insert("ormeta.FetchPlan.LockTimeout".to_string(), json!(100));
//! hints.insert("javax.persistence.lock.timeout".to_string(), json!(5));
//!
//! let applied = resolver.apply_hints(&FetchConfiguration::default(), &hints);
//! assert_eq!(applied.config.lock_timeout, 100);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod resolver;

pub use config::HintConfig;
pub use error::HintError;
pub use fetch::{FetchConfiguration, IsolationLevel, LockMode};
pub use resolver::{
    DroppedHint, HintApplication, HintClass, HintExtension, HintOutcome, HintResolver,
    RejectedHint,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
