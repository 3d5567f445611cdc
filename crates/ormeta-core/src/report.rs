//! Serializable result summaries

use crate::engine::MetadataEngine;
use indexmap::IndexMap;
use ormeta_hints::{FetchConfiguration, HintApplication};
use ormeta_model::{EntityDescriptor, QueryDescriptor, SequenceDescriptor};
use ormeta_repository::Diagnostic;
use serde::Serialize;
use serde_json::Value;

/// Everything one resolution run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolutionReport {
    pub entities: Vec<EntityDescriptor>,
    pub queries: Vec<QueryDescriptor>,
    pub sequences: Vec<SequenceDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolutionReport {
    /// Snapshot the engine's repository alongside `entities`
    #[must_use]
    pub fn collect(engine: &MetadataEngine, entities: Vec<EntityDescriptor>) -> Self {
        let repository = engine.repository();
        Self {
            entities,
            queries: repository.queries(),
            sequences: repository.sequences(),
            diagnostics: repository.diagnostics().entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEntry {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Outcome of a hint pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HintReport {
    pub fetch: FetchConfiguration,
    pub recorded: IndexMap<String, Value>,
    pub rejected: Vec<RejectedEntry>,
    pub dropped: Vec<DroppedEntry>,
    pub shadowed: Vec<String>,
}

impl From<HintApplication> for HintReport {
    fn from(application: HintApplication) -> Self {
        Self {
            fetch: application.config,
            recorded: application.recorded,
            rejected: application
                .rejected
                .into_iter()
                .map(|r| RejectedEntry {
                    key: r.key,
                    error: r.error.to_string(),
                })
                .collect(),
            dropped: application
                .dropped
                .into_iter()
                .map(|d| DroppedEntry {
                    key: d.key,
                    suggestion: d.suggestion,
                })
                .collect(),
            shadowed: application.shadowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hint_report_flattens_errors() {
        let mut hints = IndexMap::new();
        hints.insert("ormeta.FetchPlan.FetchBatchSize".to_string(), json!("many"));
        hints.insert("ormeto.FetchBatchSize".to_string(), json!(5));
        let application = ormeta_hints::HintResolver::default().apply_hints(&FetchConfiguration::default(), &hints);
        let report = HintReport::from(application);

        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].error.contains("FetchBatchSize"));
        assert_eq!(report.dropped[0].suggestion.as_deref(), Some("ormeta.FetchBatchSize"));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["fetch"]["fetch-batch-size"], json!(-1));
    }
}
