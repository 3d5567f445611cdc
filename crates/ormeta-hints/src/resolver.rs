//! Hint resolver
//!
//! Classifies hint keys and writes their values into a
//! [`FetchConfiguration`]:
//!
//! - **supported** keys go to a fetch-plan setter, a dedicated handler or an
//!   extension
//! - **recognized** keys (known prefix, unknown key) are forwarded to the
//!   opaque hint store
//! - **unrecognized** keys are dropped with a "did you mean" suggestion
//!
//! Aliases of one setting form a precedence group; a value recorded under a
//! higher-precedence alias is never overwritten through a lower one.

use crate::config::HintConfig;
use crate::error::HintError;
use crate::fetch::{FetchConfiguration, IsolationLevel, LockMode};
use crate::keys::{
    self, AGGREGATE_LISTENER, AGGREGATE_LISTENERS, ALIASES, FETCH_PLAN_PREFIX,
    FETCH_PLAN_PROPERTIES, FILTER_LISTENER, FILTER_LISTENERS, IGNORE_FETCH_GROUPS, KNOWN_PREFIXES,
    NATIVE_KEYS, OPTIMIZE_RESULT_COUNT, RESULT_SET_TYPE,
};
use indexmap::IndexMap;
use once_cell::sync::{Lazy, OnceCell};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Product-specific hint keys
pub trait HintExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Keys this extension supports outright
    fn supported_keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Prefixes whose keys are forwarded rather than dropped
    fn prefixes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Apply a supported hint; `Ok(false)` leaves it to the generic store
    ///
    /// # Errors
    ///
    /// A rejected value.
    fn apply(&self, config: &mut FetchConfiguration, key: &str, value: &Value) -> Result<bool, HintError> {
        let _ = (config, key, value);
        Ok(false)
    }
}

/// How a key is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintClass {
    Supported,
    Recognized,
    Unrecognized,
}

/// What one hint write did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Applied,
    /// Lock mode held until a transaction starts
    Deferred,
    /// Stored opaquely for the store
    Forwarded,
    /// A higher-precedence alias already holds a value
    Shadowed { by: String },
    Dropped { suggestion: Option<String> },
}

/// Hint dropped as unrecognized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedHint {
    pub key: String,
    pub suggestion: Option<String>,
}

/// Hint whose value was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedHint {
    pub key: String,
    pub error: HintError,
}

/// Result of a full hint pass
#[derive(Debug, Clone, PartialEq)]
pub struct HintApplication {
    pub config: FetchConfiguration,
    /// Effective key to value map
    pub recorded: IndexMap<String, Value>,
    pub rejected: Vec<RejectedHint>,
    pub dropped: Vec<DroppedHint>,
    /// Keys ignored in favour of a higher-precedence alias
    pub shadowed: Vec<String>,
}

type Setter = fn(&mut FetchConfiguration, &str, &Value) -> Result<HintOutcome, HintError>;

/// Fetch-plan property setters, by property name
static SETTERS: Lazy<HashMap<&'static str, Setter>> = Lazy::new(|| {
    let mut setters: HashMap<&'static str, Setter> = HashMap::new();
    setters.insert("FetchBatchSize", |config, key, value| {
        config.fetch_batch_size = int_at_least(key, value, -1)?;
        Ok(HintOutcome::Applied)
    });
    setters.insert("MaxFetchDepth", |config, key, value| {
        config.max_fetch_depth = int_at_least(key, value, -1)?;
        Ok(HintOutcome::Applied)
    });
    setters.insert("LockTimeout", |config, key, value| {
        config.lock_timeout = int_at_least(key, value, -1)?;
        Ok(HintOutcome::Applied)
    });
    setters.insert("QueryTimeout", |config, key, value| {
        config.query_timeout = int_at_least(key, value, -1)?;
        Ok(HintOutcome::Applied)
    });
    setters.insert("ReadLockMode", |config, key, value| {
        config.request_read_lock_mode(lock_mode(key, value)?);
        Ok(lock_outcome(config))
    });
    setters.insert("WriteLockMode", |config, key, value| {
        config.request_write_lock_mode(lock_mode(key, value)?);
        Ok(lock_outcome(config))
    });
    setters.insert("FetchGroups", |config, key, value| {
        config.fetch_groups = Vec::new();
        for group in string_list(key, value)? {
            config.add_fetch_group(&group);
        }
        Ok(HintOutcome::Applied)
    });
    setters.insert("ExtendedPathLookup", |config, key, value| {
        config.extended_path_lookup = boolean(key, value)?;
        Ok(HintOutcome::Applied)
    });
    setters.insert("Isolation", |config, key, value| {
        config.isolation = string(key, value)?
            .parse::<IsolationLevel>()
            .map_err(|_| HintError::invalid(key, "an isolation level", value))?;
        Ok(HintOutcome::Applied)
    });
    debug_assert!(FETCH_PLAN_PROPERTIES.iter().all(|p| setters.contains_key(p)));
    setters
});

/// Hint classification and dispatch
pub struct HintResolver {
    config: HintConfig,
    extensions: Vec<Arc<dyn HintExtension>>,
    supported: OnceCell<BTreeSet<String>>,
    prefixes: OnceCell<BTreeSet<String>>,
}

impl std::fmt::Debug for HintResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HintResolver")
            .field("config", &self.config)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Default for HintResolver {
    fn default() -> Self {
        Self::new(HintConfig::default())
    }
}

impl HintResolver {
    #[must_use]
    pub fn new(config: HintConfig) -> Self {
        Self {
            config,
            extensions: Vec::new(),
            supported: OnceCell::new(),
            prefixes: OnceCell::new(),
        }
    }

    /// Add an extension
    ///
    /// Must happen before the first hint is classified; the key sets are
    /// assembled once.
    #[must_use]
    pub fn with_extension(mut self, extension: Arc<dyn HintExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HintConfig {
        &self.config
    }

    /// Every supported key
    pub fn supported_keys(&self) -> &BTreeSet<String> {
        self.supported.get_or_init(|| {
            let mut keys: BTreeSet<String> = NATIVE_KEYS.iter().map(ToString::to_string).collect();
            keys.extend(FETCH_PLAN_PROPERTIES.iter().map(|p| format!("{FETCH_PLAN_PREFIX}{p}")));
            keys.extend(ALIASES.iter().map(|(alias, _)| alias.to_string()));
            for extension in &self.extensions {
                keys.extend(extension.supported_keys());
            }
            tracing::debug!(keys = keys.len(), "assembled supported hint keys");
            keys
        })
    }

    fn known_prefixes(&self) -> &BTreeSet<String> {
        self.prefixes.get_or_init(|| {
            let mut prefixes: BTreeSet<String> = KNOWN_PREFIXES.iter().map(ToString::to_string).collect();
            for extension in &self.extensions {
                prefixes.extend(extension.prefixes());
            }
            prefixes
        })
    }

    #[must_use]
    pub fn classify(&self, key: &str) -> HintClass {
        if self.supported_keys().contains(key) {
            HintClass::Supported
        } else if self.known_prefixes().contains(keys::prefix(key)) {
            HintClass::Recognized
        } else {
            HintClass::Unrecognized
        }
    }

    /// Closest supported key within the configured edit distance
    #[must_use]
    pub fn suggest(&self, key: &str) -> Option<String> {
        self.supported_keys()
            .iter()
            .min_by_key(|k| strsim::levenshtein(key, k))
            .filter(|k| strsim::levenshtein(key, k) <= self.config.suggestion_distance)
            .cloned()
    }

    /// Apply one hint
    ///
    /// `recorded` holds the values accepted so far in this pass and decides
    /// precedence between aliases.
    ///
    /// # Errors
    ///
    /// [`HintError`] when a supported key receives an unusable value; the
    /// configuration is left unchanged for that key.
    pub fn set_hint(
        &self,
        config: &mut FetchConfiguration,
        recorded: &mut IndexMap<String, Value>,
        key: &str,
        value: &Value,
    ) -> Result<HintOutcome, HintError> {
        match self.classify(key) {
            HintClass::Unrecognized => {
                let suggestion = self.suggest(key);
                match &suggestion {
                    Some(similar) => tracing::warn!(key, suggestion = %similar, "unrecognized hint dropped"),
                    None => tracing::warn!(key, "unrecognized hint dropped"),
                }
                Ok(HintOutcome::Dropped { suggestion })
            }
            HintClass::Recognized => {
                tracing::debug!(key, "forwarding unsupported hint");
                config.set_hint(key, value.clone());
                recorded.insert(key.to_string(), value.clone());
                Ok(HintOutcome::Forwarded)
            }
            HintClass::Supported => {
                let group = keys::precedence_of(key);
                if let Some((aliases, rank)) = group {
                    if let Some(higher) = aliases[..rank].iter().find(|k| recorded.contains_key(**k)) {
                        tracing::debug!(key, by = *higher, "hint shadowed by higher-precedence alias");
                        return Ok(HintOutcome::Shadowed {
                            by: (*higher).to_string(),
                        });
                    }
                }
                let outcome = self.dispatch(config, key, value)?;
                if let Some((aliases, rank)) = group {
                    for lower in &aliases[rank + 1..] {
                        recorded.shift_remove(*lower);
                    }
                }
                recorded.insert(key.to_string(), value.clone());
                Ok(outcome)
            }
        }
    }

    fn dispatch(
        &self,
        config: &mut FetchConfiguration,
        key: &str,
        value: &Value,
    ) -> Result<HintOutcome, HintError> {
        match key {
            OPTIMIZE_RESULT_COUNT => config.optimize_result_count = Some(int_at_least(key, value, 0)?),
            RESULT_SET_TYPE => config.result_set_type = Some(string(key, value)?.to_string()),
            IGNORE_FETCH_GROUPS => config.ignore_fetch_groups = boolean(key, value)?,
            FILTER_LISTENER => config.filter_listeners.push(string(key, value)?.to_string()),
            FILTER_LISTENERS => config.filter_listeners.extend(string_list(key, value)?),
            AGGREGATE_LISTENER => config.aggregate_listeners.push(string(key, value)?.to_string()),
            AGGREGATE_LISTENERS => config.aggregate_listeners.extend(string_list(key, value)?),
            _ => {
                let property = keys::canonical(key).strip_prefix(FETCH_PLAN_PREFIX);
                if let Some(setter) = property.and_then(|p| SETTERS.get(p)) {
                    return setter(config, key, value);
                }
                for extension in &self.extensions {
                    if extension.apply(config, key, value)? {
                        return Ok(HintOutcome::Applied);
                    }
                }
                config.set_hint(key, value.clone());
            }
        }
        Ok(HintOutcome::Applied)
    }

    /// Apply a hint map in order to a copy of `base`
    ///
    /// Bad values are collected per key and never stop the pass.
    #[must_use]
    pub fn apply_hints(&self, base: &FetchConfiguration, hints: &IndexMap<String, Value>) -> HintApplication {
        let mut application = HintApplication {
            config: base.clone(),
            recorded: IndexMap::new(),
            rejected: Vec::new(),
            dropped: Vec::new(),
            shadowed: Vec::new(),
        };
        for (key, value) in hints {
            match self.set_hint(&mut application.config, &mut application.recorded, key, value) {
                Ok(HintOutcome::Dropped { suggestion }) => application.dropped.push(DroppedHint {
                    key: key.clone(),
                    suggestion,
                }),
                Ok(HintOutcome::Shadowed { .. }) => application.shadowed.push(key.clone()),
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "hint rejected");
                    application.rejected.push(RejectedHint {
                        key: key.clone(),
                        error,
                    });
                }
            }
        }
        application
    }
}

fn lock_outcome(config: &FetchConfiguration) -> HintOutcome {
    if config.is_transaction_active() {
        HintOutcome::Applied
    } else {
        HintOutcome::Deferred
    }
}

fn int_at_least(key: &str, value: &Value, min: i64) -> Result<i64, HintError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| HintError::invalid(key, "an integer", value))?;
    if parsed < min {
        return Err(HintError::OutOfRange {
            key: key.to_string(),
            value: parsed,
            min,
        });
    }
    Ok(parsed)
}

fn boolean(key: &str, value: &Value) -> Result<bool, HintError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(HintError::invalid(key, "a boolean", value)),
    }
}

fn string<'v>(key: &str, value: &'v Value) -> Result<&'v str, HintError> {
    value.as_str().ok_or_else(|| HintError::invalid(key, "a string", value))
}

/// Array of strings, or one comma-separated string
fn string_list(key: &str, value: &Value) -> Result<Vec<String>, HintError> {
    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| string(key, item).map(str::to_string))
            .collect(),
        _ => Err(HintError::invalid(key, "a list of strings", value)),
    }
}

fn lock_mode(key: &str, value: &Value) -> Result<LockMode, HintError> {
    string(key, value)?
        .parse()
        .map_err(|_| HintError::invalid(key, "a lock mode", value))
}
