//! Resolver configuration
//!
//! Switches shared by the directive and document parsers. Deserializable with
//! every field optional.

use serde::{Deserialize, Serialize};

/// Parser behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Document values replace previously resolved ones instead of only
    /// filling unset attributes
    pub override_mode: bool,
    /// Tolerate several callbacks for one event on one declaring type
    pub allow_multiple_callbacks_per_event: bool,
    /// Ignore in-code directives for types a document describes
    pub metadata_complete: bool,
    /// Check that fetch-group includes name existing groups
    pub validate_fetch_group_includes: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            override_mode: false,
            allow_multiple_callbacks_per_event: false,
            metadata_complete: false,
            validate_fetch_group_includes: true,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_override_mode(mut self, enabled: bool) -> Self {
        self.override_mode = enabled;
        self
    }

    #[must_use]
    pub fn with_multiple_callbacks(mut self, allowed: bool) -> Self {
        self.allow_multiple_callbacks_per_event = allowed;
        self
    }

    #[must_use]
    pub fn with_metadata_complete(mut self, enabled: bool) -> Self {
        self.metadata_complete = enabled;
        self
    }

    #[must_use]
    pub fn with_fetch_group_include_validation(mut self, enabled: bool) -> Self {
        self.validate_fetch_group_includes = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::default();
        assert!(!config.override_mode);
        assert!(!config.allow_multiple_callbacks_per_event);
        assert!(config.validate_fetch_group_includes);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: ResolverConfig = serde_yaml::from_str("override-mode: true").unwrap();
        assert!(config.override_mode);
        assert!(config.validate_fetch_group_includes);
    }
}
