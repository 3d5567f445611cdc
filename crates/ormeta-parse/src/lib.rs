//! ormeta parsers
//!
//! Turns declarative sources into resolved entity metadata.
//!
//! # Overview
//!
//! - **DirectiveParser**: in-code directives of a type, its members and its
//!   package, applied per resolution mode
//! - **DocumentParser**: override documents layered over the directive base,
//!   gated by override mode and metadata-complete markers
//! - **CallbackMerger**: lifecycle callbacks with hierarchy ordering and
//!   override deduplication
//!
//! # Architecture
//!
//! ```text
//! DeclarationTable ─► DirectiveParser ─┐
//!                                      ├─► Overlay ─► MetadataRepository
//! OverrideDocument ─► DocumentParser ──┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ormeta_model::{DeclarationTable, DirectiveTag, MemberDecl, ResolutionModes, TypeDecl, ValueType};
//! use ormeta_parse::{DirectiveParser, ResolverConfig};
//! use ormeta_repository::MetadataRepository;
//!
//! let table = DeclarationTable::new()
//!     .with_type(
//!         TypeDecl::new("shop.Order")
//!             .with_directive(DirectiveTag::new("entity"))
//!             .with_field(MemberDecl::new("id", ValueType::Long).with_directive(DirectiveTag::new("id"))),
//!     )
//!     .unwrap();
//! let parser = DirectiveParser::new(Arc::new(table), MetadataRepository::shared(), ResolverConfig::default());
//! let order = parser.resolve("shop.Order", ResolutionModes::META).unwrap().unwrap();
//! assert!(order.field("id").unwrap().primary_key);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod apply;
pub mod config;
pub mod directives;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod structure;

pub use config::ResolverConfig;
pub use directives::{DirectiveParser, ExtensionHook, NoExtensions};
pub use document::{DocumentParser, OverrideDocument};
pub use error::ResolveError;
pub use lifecycle::{CallbackMerger, CallbackSet, Walk};
pub use structure::{finish_meta, infer_missing_strategies, validate_complete, validate_fetch_groups};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
