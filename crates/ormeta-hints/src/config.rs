//! Hint resolver configuration

use crate::fetch::FetchConfiguration;
use serde::{Deserialize, Serialize};

/// Resolver switches and the base configuration hints start from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HintConfig {
    /// Largest edit distance offered as a "did you mean" suggestion
    pub suggestion_distance: usize,
    /// Starting point for hint passes that have no explicit base
    pub fetch: FetchConfiguration,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            suggestion_distance: 3,
            fetch: FetchConfiguration::default(),
        }
    }
}
