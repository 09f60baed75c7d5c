use thiserror::Error;

/// Failure reported by a store collaborator.
///
/// Third-party stores map their own failures into [`StorageError::Backend`];
/// the engine passes it through to the caller untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Credential already registered for user {0}")]
    DuplicateCredential(String),
}
