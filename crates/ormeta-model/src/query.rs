//! Named queries and sequence generators
//!
//! Both are registered globally per repository by name.

use crate::source::{MetadataSource, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query string dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryLanguage {
    /// Object query language
    Jpql,
    /// Native store query
    Sql,
}

/// Named declarative query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub name: String,
    pub query: String,
    pub language: QueryLanguage,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_mode: Option<String>,
    /// Result type of native queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    /// Type or package the query was declared on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defining_type: Option<String>,
    pub source: MetadataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl QueryDescriptor {
    /// Query with no hints
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        language: QueryLanguage,
        source: MetadataSource,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            language,
            hints: BTreeMap::new(),
            lock_mode: None,
            result_type: None,
            defining_type: None,
            source,
            location: None,
        }
    }

    /// Set the declaring scope
    #[must_use]
    pub fn with_defining_type(mut self, defining_type: impl Into<String>) -> Self {
        self.defining_type = Some(defining_type.into());
        self
    }

    /// Set the source location
    #[must_use]
    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

/// Default first value of a sequence
pub const DEFAULT_INITIAL_VALUE: i64 = 1;

/// Default number of values reserved per allocation
pub const DEFAULT_ALLOCATION_SIZE: i64 = 50;

/// Named identifier generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    pub name: String,
    /// Store-side sequence name, when different from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_name: Option<String>,
    pub initial_value: i64,
    pub allocation_size: i64,
    pub source: MetadataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl SequenceDescriptor {
    /// Sequence with default initial value and allocation size
    #[must_use]
    pub fn new(name: impl Into<String>, source: MetadataSource) -> Self {
        Self {
            name: name.into(),
            sequence_name: None,
            initial_value: DEFAULT_INITIAL_VALUE,
            allocation_size: DEFAULT_ALLOCATION_SIZE,
            source,
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_defaults() {
        let seq = SequenceDescriptor::new("order_seq", MetadataSource::Directives);
        assert_eq!(seq.initial_value, 1);
        assert_eq!(seq.allocation_size, 50);
        assert!(seq.sequence_name.is_none());
    }

    #[test]
    fn query_serializes_language_kebab() {
        let query = QueryDescriptor::new(
            "Order.all",
            "select o from Order o",
            QueryLanguage::Jpql,
            MetadataSource::Directives,
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["language"], "jpql");
        assert!(json.get("hints").is_none());
    }
}
