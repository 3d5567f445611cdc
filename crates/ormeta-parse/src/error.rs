//! Error types for metadata resolution
//!
//! One variant per fatal outcome; each carries the identity of the offending
//! entity, field, directive or document so a single message is actionable:
//! - unsupported directives (recognized, but meaningless where used)
//! - structural mismatches between a directive and a value shape
//! - incomplete resolution, aggregated over every unresolved field
//! - invalid references (fetch groups, map keys, undeclared members)
//! - document syntax errors

use ormeta_model::{LifecycleEvent, ModelError};

/// Fatal resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Recognized directive with no meaning in this context
    #[error("{entity}: directive '{directive}' is not supported on {element}: {reason}")]
    UnsupportedDirective {
        entity: String,
        element: String,
        directive: String,
        reason: String,
    },

    /// Directive applied to a value shape that cannot carry it
    #[error("{entity}.{field}: directive '{directive}' cannot apply to value type '{value_type}'")]
    StructuralMismatch {
        entity: String,
        field: String,
        directive: String,
        value_type: String,
    },

    /// Two strategy directives on one field
    #[error("{entity}.{field}: conflicting strategy directives '{first}' and '{second}'")]
    ConflictingStrategy {
        entity: String,
        field: String,
        first: String,
        second: String,
    },

    /// Fields that ended resolution without a strategy
    #[error("{entity}: no strategy resolved for field(s): {}", .fields.join(", "))]
    IncompleteResolution { entity: String, fields: Vec<String> },

    /// Fetch group references a missing or non-persistent field
    #[error("{entity}: fetch group '{group}' references unknown or non-persistent field '{field}'")]
    UnknownFetchGroupField {
        entity: String,
        group: String,
        field: String,
    },

    /// Fetch group malformed (empty or duplicate name, missing include)
    #[error("{entity}: invalid fetch group '{group}': {reason}")]
    InvalidFetchGroup {
        entity: String,
        group: String,
        reason: String,
    },

    /// Map key names a member the element type does not declare
    #[error("{entity}.{field}: map key '{key}' is not a member of '{element_type}'")]
    UnknownMapKey {
        entity: String,
        field: String,
        key: String,
        element_type: String,
    },

    /// Document names a field the type does not declare
    #[error("{entity}: document '{document}' references undeclared field '{field}'")]
    UnknownField {
        entity: String,
        field: String,
        document: String,
    },

    /// Document or listener names a type missing from the declaration table
    #[error("type '{0}' is not declared")]
    UnknownType(String),

    /// Callback names a method the type hierarchy does not declare
    #[error("type '{type_name}' declares no method '{method}'")]
    UnknownMethod { type_name: String, method: String },

    /// Several callbacks for one event on one declaring type
    #[error("{entity}: {} callbacks for '{event}' declared on '{declaring_type}': {}", .methods.len(), .methods.join(", "))]
    MultipleCallbacks {
        entity: String,
        event: LifecycleEvent,
        declaring_type: String,
        methods: Vec<String>,
    },

    /// Directive attributes failed coercion
    #[error("{entity}: {element}: {source}")]
    Attribute {
        entity: String,
        element: String,
        #[source]
        source: ModelError,
    },

    /// Override document could not be read
    #[error("document '{document}'{}: {message}", .line.map(|l| format!(" line {l}")).unwrap_or_default())]
    Document {
        document: String,
        line: Option<usize>,
        message: String,
    },
}

impl ResolveError {
    /// Create unsupported directive error
    pub fn unsupported(
        entity: impl Into<String>,
        element: impl Into<String>,
        directive: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedDirective {
            entity: entity.into(),
            element: element.into(),
            directive: directive.into(),
            reason: reason.into(),
        }
    }

    /// Create structural mismatch error
    pub fn mismatch(
        entity: impl Into<String>,
        field: impl Into<String>,
        directive: impl Into<String>,
        value_type: impl ToString,
    ) -> Self {
        Self::StructuralMismatch {
            entity: entity.into(),
            field: field.into(),
            directive: directive.into(),
            value_type: value_type.to_string(),
        }
    }

    /// Wrap an attribute coercion failure
    pub fn attribute(entity: impl Into<String>, element: impl Into<String>, source: ModelError) -> Self {
        Self::Attribute {
            entity: entity.into(),
            element: element.into(),
            source,
        }
    }

    /// Create document error
    pub fn document(document: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Document {
            document: document.into(),
            line,
            message: message.into(),
        }
    }
}
