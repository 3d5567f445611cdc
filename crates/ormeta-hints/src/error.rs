//! Hint errors

/// Rejection of one hint
///
/// Never aborts a hint pass; the key is reported and the rest continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintError {
    /// Value could not be coerced to the setting's type
    #[error("hint '{key}': expected {expected}, got {value}")]
    InvalidValue {
        key: String,
        expected: &'static str,
        value: String,
    },

    /// Numeric value below the setting's minimum
    #[error("hint '{key}': {value} is out of range (minimum {min})")]
    OutOfRange { key: String, value: i64, min: i64 },

    /// Extension refused the value
    #[error("hint '{key}' rejected by extension '{extension}': {reason}")]
    Extension {
        key: String,
        extension: String,
        reason: String,
    },
}

impl HintError {
    /// Create invalid value error
    pub fn invalid(key: impl Into<String>, expected: &'static str, value: &serde_json::Value) -> Self {
        Self::InvalidValue {
            key: key.into(),
            expected,
            value: value.to_string(),
        }
    }
}
