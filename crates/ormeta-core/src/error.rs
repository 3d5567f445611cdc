//! Engine errors

use ormeta_model::ModelError;
use ormeta_parse::ResolveError;
use std::path::PathBuf;

/// Errors surfaced by [`MetadataEngine`](crate::MetadataEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Resolution of a type or document failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Declaration table could not be built
    #[error(transparent)]
    Declarations(#[from] ModelError),

    /// Configuration file could not be decoded
    #[error("configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Whether the failure concerns one entity rather than engine setup
    #[inline]
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
