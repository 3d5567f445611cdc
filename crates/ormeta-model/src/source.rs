//! Metadata provenance
//!
//! Records where a descriptor came from so diagnostics can point at it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Best-effort source position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the metadata was read from
    pub file: String,
    /// 1-based line, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl SourceLocation {
    /// Location with only a file
    #[inline]
    #[must_use]
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// Location with file and line
    #[inline]
    #[must_use]
    pub fn at_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: None,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "{}:{line}:{col}", self.file),
            (Some(line), None) => write!(f, "{}:{line}", self.file),
            _ => f.write_str(&self.file),
        }
    }
}

/// Which declarative source populated part of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataSource {
    /// In-code directives on the type and its members
    Directives,
    /// A named override document
    Document(String),
}

impl Display for MetadataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directives => f.write_str("directives"),
            Self::Document(name) => write!(f, "document '{name}'"),
        }
    }
}
