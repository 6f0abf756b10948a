//! Retry logic with exponential backoff
//!
//! This module provides:
//! - Error classification (retryable vs permanent)
//! - Exponential backoff with jitter, honouring server-requested waits
//! - Max retry limits
//! - Cancellation support

pub mod classifier;
pub mod strategy;

pub use classifier::{ErrorClass, RetryClassifiable, RetryReason};
pub use strategy::{RetryConfig, execute_with_backoff};

/// Retry error types
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: E },

    #[error("permanent error (not retryable): {0}")]
    Permanent(E),

    #[error("retry aborted by cancellation")]
    Aborted,
}
