//! Fetch groups
//!
//! Named sets of fields materialized together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Built-in group holding default-fetch fields
pub const DEFAULT_GROUP: &str = "default";

/// Built-in group holding every persistent field
pub const ALL_GROUP: &str = "all";

/// Named per-entity grouping of fields to load eagerly together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchGroup {
    pub name: String,
    /// Load the group right after the owning object loads
    pub post_load: bool,
    /// Included field names, in declaration order of the group
    pub fields: Vec<String>,
    /// Recursion depth overrides keyed by field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recursion_depths: BTreeMap<String, i32>,
    /// Other groups pulled in by this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
}

impl FetchGroup {
    /// Empty group
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            post_load: false,
            fields: Vec::new(),
            recursion_depths: BTreeMap::new(),
            includes: Vec::new(),
        }
    }

    /// Whether `name` is one of the implicit groups every entity has
    #[inline]
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        name == DEFAULT_GROUP || name == ALL_GROUP
    }

    /// Add a field, optionally with a recursion depth
    pub fn add_field(&mut self, field: impl Into<String>, depth: Option<i32>) {
        let field = field.into();
        if let Some(depth) = depth {
            self.recursion_depths.insert(field.clone(), depth);
        }
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Check field membership
    #[inline]
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_field_deduplicates() {
        let mut group = FetchGroup::new("detail");
        group.add_field("items", Some(2));
        group.add_field("items", None);
        assert_eq!(group.fields, vec!["items".to_string()]);
        assert_eq!(group.recursion_depths.get("items"), Some(&2));
    }

    #[test]
    fn builtins() {
        assert!(FetchGroup::is_builtin("default"));
        assert!(FetchGroup::is_builtin("all"));
        assert!(!FetchGroup::is_builtin("detail"));
    }
}
