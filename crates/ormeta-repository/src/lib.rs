//! ormeta metadata repository
//!
//! Shared store of resolved entity metadata.
//!
//! # Overview
//!
//! The repository provides:
//! - **MetadataRepository**: entities, named queries, sequence generators and
//!   package modes, keyed by identity and safe to share across threads
//! - **EntityEntry**: per-entity descriptor lock plus re-entrant populate lock
//! - **DiagnosticLog**: append-only record of every non-fatal outcome
//!
//! # Example
//!
//! ```rust
//! use ormeta_model::{MetadataSource, QueryDescriptor, QueryLanguage};
//! use ormeta_repository::{DiagnosticCode, MetadataRepository};
//!
//! let repo = MetadataRepository::new();
//! let q = |text: &str| {
//!     QueryDescriptor::new("Order.all", text, QueryLanguage::Jpql, MetadataSource::Directives)
//! };
//! assert!(repo.register_query(q("select o from Order o")));
//! assert!(!repo.register_query(q("select 1")));
//! assert_eq!(repo.query("Order.all").unwrap().query, "select o from Order o");
//! assert_eq!(repo.diagnostics().count(DiagnosticCode::DuplicateQuery), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod diagnostics;
pub mod error;
pub mod repository;

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLevel, DiagnosticLog};
pub use error::RepositoryError;
pub use repository::{EntityEntry, MetadataRepository};
