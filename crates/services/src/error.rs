//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::HintError;
use storage::repository::StorageError;

/// Errors emitted by `HintSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HintSessionError {
    #[error(transparent)]
    Hint(#[from] HintError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
