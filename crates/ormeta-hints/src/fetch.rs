//! Fetch configuration
//!
//! The runtime settings hints write into. Lock modes requested outside a
//! transaction are held as pending and take effect on
//! [`FetchConfiguration::begin_transaction`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Lock level for reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockMode {
    None,
    Read,
    Write,
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
}

impl LockMode {
    const ALL: [Self; 8] = [
        Self::None,
        Self::Read,
        Self::Write,
        Self::Optimistic,
        Self::OptimisticForceIncrement,
        Self::PessimisticRead,
        Self::PessimisticWrite,
        Self::PessimisticForceIncrement,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
            Self::Optimistic => "optimistic",
            Self::OptimisticForceIncrement => "optimistic-force-increment",
            Self::PessimisticRead => "pessimistic-read",
            Self::PessimisticWrite => "pessimistic-write",
            Self::PessimisticForceIncrement => "pessimistic-force-increment",
        }
    }
}

impl Display for LockMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockMode {
    type Err = String;

    /// Accepts kebab, snake and upper-case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// Transaction isolation requested for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "default" => Ok(Self::Default),
            "read-uncommitted" => Ok(Self::ReadUncommitted),
            "read-committed" => Ok(Self::ReadCommitted),
            "repeatable-read" => Ok(Self::RepeatableRead),
            "serializable" => Ok(Self::Serializable),
            _ => Err(s.to_string()),
        }
    }
}

/// Settings of one query or lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfiguration {
    /// Rows fetched per round trip; -1 leaves it to the store
    pub fetch_batch_size: i64,
    /// Relation depth loaded eagerly; -1 is unlimited
    pub max_fetch_depth: i64,
    /// Milliseconds; -1 waits indefinitely
    pub lock_timeout: i64,
    pub query_timeout: i64,
    pub read_lock_mode: Option<LockMode>,
    pub write_lock_mode: Option<LockMode>,
    pub fetch_groups: Vec<String>,
    pub extended_path_lookup: bool,
    pub isolation: IsolationLevel,
    pub optimize_result_count: Option<i64>,
    pub result_set_type: Option<String>,
    pub ignore_fetch_groups: bool,
    pub filter_listeners: Vec<String>,
    pub aggregate_listeners: Vec<String>,
    /// Opaque hints passed through to the store
    pub hints: BTreeMap<String, Value>,
    #[serde(skip)]
    pending_read_lock_mode: Option<LockMode>,
    #[serde(skip)]
    pending_write_lock_mode: Option<LockMode>,
    #[serde(skip)]
    transaction_active: bool,
}

impl Default for FetchConfiguration {
    fn default() -> Self {
        Self {
            fetch_batch_size: -1,
            max_fetch_depth: -1,
            lock_timeout: -1,
            query_timeout: -1,
            read_lock_mode: None,
            write_lock_mode: None,
            fetch_groups: vec!["default".to_string()],
            extended_path_lookup: false,
            isolation: IsolationLevel::Default,
            optimize_result_count: None,
            result_set_type: None,
            ignore_fetch_groups: false,
            filter_listeners: Vec::new(),
            aggregate_listeners: Vec::new(),
            hints: BTreeMap::new(),
            pending_read_lock_mode: None,
            pending_write_lock_mode: None,
            transaction_active: false,
        }
    }
}

impl FetchConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.transaction_active
    }

    /// Start a transaction, promoting pending lock modes
    pub fn begin_transaction(&mut self) {
        self.transaction_active = true;
        if let Some(mode) = self.pending_read_lock_mode.take() {
            self.read_lock_mode = Some(mode);
        }
        if let Some(mode) = self.pending_write_lock_mode.take() {
            self.write_lock_mode = Some(mode);
        }
    }

    pub fn end_transaction(&mut self) {
        self.transaction_active = false;
    }

    /// Request a read lock mode; deferred until a transaction is active
    pub fn request_read_lock_mode(&mut self, mode: LockMode) {
        if self.transaction_active {
            self.read_lock_mode = Some(mode);
        } else {
            self.pending_read_lock_mode = Some(mode);
        }
    }

    /// Request a write lock mode; deferred until a transaction is active
    pub fn request_write_lock_mode(&mut self, mode: LockMode) {
        if self.transaction_active {
            self.write_lock_mode = Some(mode);
        } else {
            self.pending_write_lock_mode = Some(mode);
        }
    }

    #[must_use]
    pub fn pending_read_lock_mode(&self) -> Option<LockMode> {
        self.pending_read_lock_mode
    }

    #[must_use]
    pub fn pending_write_lock_mode(&self) -> Option<LockMode> {
        self.pending_write_lock_mode
    }

    /// Store an opaque hint
    pub fn set_hint(&mut self, key: impl Into<String>, value: Value) {
        self.hints.insert(key.into(), value);
    }

    #[must_use]
    pub fn hint(&self, key: &str) -> Option<&Value> {
        self.hints.get(key)
    }

    /// Add a fetch group once
    pub fn add_fetch_group(&mut self, name: &str) {
        if !self.fetch_groups.iter().any(|g| g == name) {
            self.fetch_groups.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_mode_spellings() {
        assert_eq!("PESSIMISTIC_WRITE".parse::<LockMode>(), Ok(LockMode::PessimisticWrite));
        assert_eq!("optimistic-force-increment".parse::<LockMode>(), Ok(LockMode::OptimisticForceIncrement));
        assert!("exclusive".parse::<LockMode>().is_err());
    }

    #[test]
    fn pending_lock_modes_promote_on_begin() {
        let mut config = FetchConfiguration::new();
        config.request_read_lock_mode(LockMode::PessimisticRead);
        assert_eq!(config.read_lock_mode, None);
        assert_eq!(config.pending_read_lock_mode(), Some(LockMode::PessimisticRead));

        config.begin_transaction();
        assert_eq!(config.read_lock_mode, Some(LockMode::PessimisticRead));
        assert_eq!(config.pending_read_lock_mode(), None);

        config.request_write_lock_mode(LockMode::Write);
        assert_eq!(config.write_lock_mode, Some(LockMode::Write));
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: FetchConfiguration =
            serde_json::from_str(r#"{"fetch-batch-size": 50, "isolation": "serializable"}"#).unwrap();
        assert_eq!(config.fetch_batch_size, 50);
        assert_eq!(config.isolation, IsolationLevel::Serializable);
        assert_eq!(config.fetch_groups, ["default"]);
    }
}
