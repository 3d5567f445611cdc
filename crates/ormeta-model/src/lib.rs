//! ormeta metadata model
//!
//! Typed building blocks shared by every ormeta crate.
//!
//! # Core Concepts
//!
//! - [`EntityDescriptor`] / [`FieldDescriptor`]: the resolved structural
//!   description of a persistent type and its members
//! - [`FetchGroup`], [`LifecycleDescriptor`], [`QueryDescriptor`],
//!   [`SequenceDescriptor`]: the remaining per-entity and global metadata
//! - [`ResolutionModes`]: which resolution phases have been applied
//! - [`DeclarationTable`]: once-built description of program types, consulted
//!   through [`TypeIntrospector`]
//! - [`DirectiveTag`] / [`Directive`]: raw and typed declarative markers
//! - [`DirectiveKind`] and [`infer_strategy`]: the strategy catalog
//!
//! # Example
//!
//! ```rust
//! use ormeta_model::{infer_strategy, DeclarationTable, Strategy, ValueType};
//!
//! let table = DeclarationTable::new();
//! assert_eq!(infer_strategy(&ValueType::Long, &table), Some(Strategy::Basic));
//! assert_eq!(infer_strategy(&ValueType::object("Unknown"), &table), None);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod declaration;
pub mod directive;
pub mod entity;
pub mod error;
pub mod fetch_group;
pub mod field;
pub mod lifecycle;
pub mod mode;
pub mod query;
pub mod source;
pub mod value;

pub use catalog::{infer_strategy, strategy_accepts, DirectiveKind, DirectiveRole, Placement};
pub use declaration::{
    DeclarationTable, MemberDecl, MethodDecl, PackageDecl, TypeDecl, TypeIntrospector, TypeKind,
};
pub use directive::{
    AttrValue, BasicDirective, Directive, DirectiveTag, FetchAttribute, FetchGroupDirective,
    NamedQueryDirective, RelationDirective, SequenceGeneratorDirective,
};
pub use entity::{
    simple_name, AccessType, DetachedState, EntityDescriptor, EntityKind, IdentityKind,
    SourceModes, TableMapping,
};
pub use error::ModelError;
pub use fetch_group::{FetchGroup, ALL_GROUP, DEFAULT_GROUP};
pub use field::{
    Cascades, ColumnMapping, EnumType, FetchType, FieldDescriptor, GeneratedValue,
    GenerationType, Management, NullHandling, Strategy, StrategyOrigin, ValueDescriptor,
};
pub use lifecycle::{CallbackAdapter, CallbackBucket, LifecycleDescriptor, LifecycleEvent};
pub use mode::{ResolutionMode, ResolutionModes};
pub use query::{QueryDescriptor, QueryLanguage, SequenceDescriptor};
pub use source::{MetadataSource, SourceLocation};
pub use value::{TemporalKind, ValueType};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
