//! Diagnostics sink
//!
//! Append-only record of every non-fatal outcome (duplicate registrations,
//! idempotent re-parses, lenient callback conflicts). Each entry is mirrored
//! to `tracing` at its level so the log and the subscriber stay in step.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// Entity already resolved for the requested modes
    DuplicateParse,
    /// A second document tried to define an already-defined entity
    DuplicateEntity,
    DuplicateQuery,
    DuplicateSequence,
    /// More than one callback for an event on one declaring type, tolerated
    MultipleCallbacks,
    /// Directive unknown to the catalog, left to the extension hook
    ExtensionDirective,
    /// Override document value ignored outside override mode
    OverrideIgnored,
}

impl DiagnosticCode {
    /// Level the code is recorded at
    #[must_use]
    pub fn level(self) -> DiagnosticLevel {
        match self {
            Self::DuplicateParse => DiagnosticLevel::Debug,
            Self::ExtensionDirective | Self::OverrideIgnored => DiagnosticLevel::Info,
            Self::DuplicateEntity
            | Self::DuplicateQuery
            | Self::DuplicateSequence
            | Self::MultipleCallbacks => DiagnosticLevel::Warn,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateParse => "duplicate-parse",
            Self::DuplicateEntity => "duplicate-entity",
            Self::DuplicateQuery => "duplicate-query",
            Self::DuplicateSequence => "duplicate-sequence",
            Self::MultipleCallbacks => "multiple-callbacks",
            Self::ExtensionDirective => "extension-directive",
            Self::OverrideIgnored => "override-ignored",
        }
    }
}

impl Display for DiagnosticCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub level: DiagnosticLevel,
    /// Entity, query, sequence or member the diagnostic is about
    pub subject: String,
    pub message: String,
}

/// Append-only diagnostic log
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    inner: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and emit a diagnostic
    pub fn record(&self, code: DiagnosticCode, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            code,
            level: code.level(),
            subject: subject.into(),
            message: message.into(),
        };
        match diagnostic.level {
            DiagnosticLevel::Debug => {
                tracing::debug!(code = %code, subject = %diagnostic.subject, "{}", diagnostic.message);
            }
            DiagnosticLevel::Info => {
                tracing::info!(code = %code, subject = %diagnostic.subject, "{}", diagnostic.message);
            }
            DiagnosticLevel::Warn => {
                tracing::warn!(code = %code, subject = %diagnostic.subject, "{}", diagnostic.message);
            }
        }
        self.inner.lock().push(diagnostic);
    }

    /// Snapshot of every entry, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }

    /// Entries with the given code
    #[must_use]
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<Diagnostic> {
        self.inner
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }

    /// Number of entries with the given code
    #[must_use]
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.inner.lock().iter().filter(|d| d.code == code).count()
    }

    /// Entries at warning level
    #[must_use]
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.inner
            .lock()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
