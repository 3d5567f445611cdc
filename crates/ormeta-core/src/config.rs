//! Engine configuration
//!
//! One file carries the parser switches and the hint settings:
//!
//! ```yaml
//! resolver:
//!   override-mode: true
//! hints:
//!   suggestion-distance: 2
//!   fetch: { fetch-batch-size: 100 }
//! ```

use crate::error::{EngineError, Result};
use ormeta_hints::HintConfig;
use ormeta_parse::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    pub resolver: ResolverConfig,
    pub hints: HintConfig,
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: HintConfig) -> Self {
        self.hints = hints;
        self
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    ///
    /// # Errors
    ///
    /// [`EngineError::Io`] or [`EngineError::Config`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| EngineError::Config {
            path: path.to_path_buf(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_yaml_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "resolver:\n  override-mode: true\nhints:\n  fetch: {{ fetch-batch-size: 100 }}").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.resolver.override_mode);
        assert!(config.resolver.validate_fetch_group_includes);
        assert_eq!(config.hints.fetch.fetch_batch_size, 100);
        assert_eq!(config.hints.suggestion_distance, 3);
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{\"resolver\": {{\"override-mode\": \"sometimes\"}}}}").unwrap();
        assert!(matches!(EngineConfig::load(file.path()), Err(EngineError::Config { .. })));
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EngineConfig::load(&dir.path().join("absent.yaml")),
            Err(EngineError::Io { .. })
        ));
    }
}
