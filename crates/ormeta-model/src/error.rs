//! Error types for the metadata model
//!
//! Raised while coercing raw directive tags into typed directives and while
//! building declaration tables.

/// Errors from model construction and directive coercion
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Attribute present but of the wrong shape
    #[error("directive '{directive}': attribute '{attribute}' must be {expected}")]
    InvalidAttribute {
        directive: String,
        attribute: String,
        expected: &'static str,
    },

    /// Required attribute absent
    #[error("directive '{directive}': missing required attribute '{attribute}'")]
    MissingAttribute { directive: String, attribute: String },

    /// Attribute value outside the allowed vocabulary
    #[error("directive '{directive}': unknown value '{value}' for attribute '{attribute}'")]
    UnknownValue {
        directive: String,
        attribute: String,
        value: String,
    },

    /// Unparseable resolution mode name
    #[error("invalid resolution mode: '{0}'")]
    InvalidMode(String),

    /// Unparseable value type text
    #[error("invalid value type: '{0}'")]
    InvalidValueType(String),

    /// Declaration table refers to a type twice
    #[error("type '{0}' declared more than once")]
    DuplicateDeclaration(String),

    /// Declaration table text could not be decoded
    #[error("declaration table syntax error: {0}")]
    Syntax(String),
}

impl ModelError {
    /// Create invalid attribute error
    pub fn invalid_attribute(
        directive: impl Into<String>,
        attribute: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidAttribute {
            directive: directive.into(),
            attribute: attribute.into(),
            expected,
        }
    }

    /// Create missing attribute error
    pub fn missing_attribute(directive: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            directive: directive.into(),
            attribute: attribute.into(),
        }
    }

    /// Create unknown value error
    pub fn unknown_value(
        directive: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::UnknownValue {
            directive: directive.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}
