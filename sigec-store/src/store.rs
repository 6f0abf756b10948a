//! Spreadsheet transport abstraction

use std::time::Duration;

use async_trait::async_trait;
use sigec_codec::Row;
use thiserror::Error;

use crate::retry::{ErrorClass, RetryClassifiable, RetryReason};

/// Failure reported by a [`SheetStore`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("rate limited by the store (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("store call timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store does not support {0}")]
    Unsupported(&'static str),
}

impl RetryClassifiable for StoreError {
    fn classify(&self) -> ErrorClass {
        match self {
            StoreError::RateLimited { .. } => ErrorClass::Retryable(RetryReason::RateLimited),
            StoreError::Timeout => ErrorClass::Retryable(RetryReason::Timeout),
            StoreError::Unavailable(_) | StoreError::Unsupported(_) => ErrorClass::Permanent,
        }
    }

    fn suggested_backoff(&self) -> Option<Duration> {
        match self {
            StoreError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A worksheet addressed by 1-based row number.
///
/// Row 1 is the header. Rows come back with trailing blank cells removed,
/// so a row may be shorter than the schema.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn header_row(&self) -> Result<Row, StoreError>;

    /// Every row, header first.
    async fn all_rows(&self) -> Result<Vec<Row>, StoreError>;

    /// Overwrite row `position` with `row`.
    async fn write_row(&self, position: usize, row: Row) -> Result<(), StoreError>;

    async fn append_row(&self, row: Row) -> Result<(), StoreError>;

    /// Remove row `position`, shifting later rows up.
    async fn delete_row(&self, _position: usize) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("row deletion"))
    }
}
