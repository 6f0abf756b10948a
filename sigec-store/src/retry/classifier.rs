//! Error classification for retry decisions

use std::time::Duration;

/// Top-level error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient; the same call may succeed after a backoff.
    Retryable(RetryReason),

    /// Retrying cannot help.
    Permanent,
}

/// Why a failure is considered transient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    RateLimited,
    Timeout,
    /// Retries ran out inside this process; the caller may try again later.
    Exhausted,
}

/// Trait for error classification
pub trait RetryClassifiable {
    fn classify(&self) -> ErrorClass;

    fn is_retryable(&self) -> bool {
        matches!(self.classify(), ErrorClass::Retryable(_))
    }

    /// Wait requested by the remote side, if any.
    fn suggested_backoff(&self) -> Option<Duration> {
        None
    }
}
