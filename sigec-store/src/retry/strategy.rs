//! Backoff strategy
//!
//! Delays come from backon's exponential schedule. A rate-limit answer that
//! names its own wait stretches the next delay to at least that long.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::RetryError;
use super::classifier::RetryClassifiable;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt; a call runs at most
    /// `max_retries + 1` times.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomise each delay to spread out concurrent retries.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_retries() -> usize {
    3
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Delay schedule: `max_retries` delays growing from the initial
    /// backoff by `backoff_multiplier`, capped at the maximum.
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_backoff_ms))
            .with_max_delay(Duration::from_millis(self.max_backoff_ms))
            .with_factor(self.backoff_multiplier as f32)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the schedule
/// runs out.
///
/// Cancellation is checked before each attempt and during backoff sleeps;
/// an attempt that has started is never interrupted.
pub async fn execute_with_backoff<F, Fut, T, E>(
    operation_name: &'static str,
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + RetryClassifiable,
{
    let mut delays = config.backoff().build();
    let mut attempts = 0usize;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(RetryError::Aborted);
        }

        attempts += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(RetryError::Permanent(err));
        }

        let Some(scheduled) = delays.next() else {
            tracing::warn!(
                operation = operation_name,
                attempts,
                error = %err,
                "Store call retries exhausted"
            );
            return Err(RetryError::Exhausted {
                attempts,
                last: err,
            });
        };
        let delay = err
            .suggested_backoff()
            .map_or(scheduled, |requested| requested.max(scheduled));

        tracing::warn!(
            operation = operation_name,
            attempt = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Retrying store call"
        );

        if wait_with_cancel(cancel, delay).await.is_err() {
            return Err(RetryError::Aborted);
        }
    }
}

async fn wait_with_cancel(cancel: Option<&CancellationToken>, duration: Duration) -> Result<(), ()> {
    if duration.is_zero() {
        return Ok(());
    }
    match cancel {
        Some(cancel) => tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(()),
        },
        None => {
            tokio::time::sleep(duration).await;
            Ok(())
        }
    }
}
