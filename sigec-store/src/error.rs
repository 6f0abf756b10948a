//! Error types for store synchronisation

use sigec_codec::SchemaError;
use thiserror::Error;

use crate::retry::{ErrorClass, RetryClassifiable, RetryError, RetryReason};
use crate::store::StoreError;

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Coordinator error taxonomy
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(
        "sheet header disagrees with schema at column {position}: expected '{expected}', found '{found}'"
    )]
    SchemaMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("store unavailable during {operation} after {attempts} attempts: {reason}")]
    StoreUnavailable {
        operation: &'static str,
        attempts: usize,
        reason: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    pub(crate) fn from_retry(operation: &'static str, err: RetryError<StoreError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => SyncError::StoreUnavailable {
                operation,
                attempts,
                reason: last.to_string(),
            },
            RetryError::Permanent(source) => SyncError::Store { operation, source },
            RetryError::Aborted => SyncError::Cancelled,
        }
    }

    /// Whether the caller submitted data the schema rejects.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, SyncError::Schema(err) if err.is_validation_failure())
    }
}

impl RetryClassifiable for SyncError {
    fn classify(&self) -> ErrorClass {
        match self {
            SyncError::StoreUnavailable { .. } => ErrorClass::Retryable(RetryReason::Exhausted),
            SyncError::Store { source, .. } => source.classify(),
            SyncError::Schema(_) | SyncError::SchemaMismatch { .. } | SyncError::Cancelled => {
                ErrorClass::Permanent
            }
        }
    }
}
