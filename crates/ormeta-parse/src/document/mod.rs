//! Override documents: immutable tree and layered resolution

pub mod model;
pub mod parser;

pub use model::{
    AttributeElement, AttributeKind, Attributes, DocumentEntity, FetchGroupElement,
    ListenerElement, OverrideDocument, QueryElement, SequenceElement, TypeElement, UnitMetadata,
};
pub use parser::DocumentParser;
