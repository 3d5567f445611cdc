//! Repository errors

/// Errors from repository mutations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Mutation addressed a type that has no descriptor
    #[error("no entity descriptor for type '{0}'")]
    UnknownEntity(String),
}
