#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sigec_store::{MemorySheet, Operation, SaveOutcome, StoreError, SyncConfig, SyncCoordinator, SyncError};

use common::{client, coordinator, fast_config, schema};

#[tokio::test(start_paused = true)]
async fn locate_recovers_from_three_rate_limits() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema().header()]));
    sheet.rate_limit_next(Operation::AllRows, 3).await;
    let sync = coordinator(&sheet);

    let outcome = sync.save(&client("c-1", "A")).await.expect("retried");

    assert_eq!(outcome, SaveOutcome::Appended);
    let attempts = sheet.calls(Operation::AllRows).await;
    assert_eq!(attempts, 4);
    assert!(attempts <= sync.config().retry.max_retries + 1);
    assert_eq!(sheet.rows().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limit_is_store_unavailable() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema().header()]));
    sheet.rate_limit_next(Operation::AllRows, 10).await;
    let sync = coordinator(&sheet);

    let err = sync.save(&client("c-1", "A")).await.expect_err("gives up");

    assert!(matches!(
        err,
        SyncError::StoreUnavailable {
            operation: "locate",
            attempts: 4,
            ..
        }
    ));
    assert_eq!(sheet.calls(Operation::AllRows).await, 4);
    assert_eq!(sheet.writes().await, 0);
}

#[tokio::test(start_paused = true)]
async fn requested_wait_is_respected() {
    let sheet = Arc::new(MemorySheet::with_rows(vec![schema().header()]));
    sheet
        .fail_next(
            Operation::AppendRow,
            1,
            StoreError::RateLimited {
                retry_after: Some(Duration::from_secs(30)),
            },
        )
        .await;
    let sync = coordinator(&sheet);
    let start = tokio::time::Instant::now();

    sync.save(&client("c-1", "A")).await.expect("retried");

    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(sheet.calls(Operation::AppendRow).await, 2);
    assert_eq!(sheet.rows().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unavailable_store_is_not_retried() {
    let sheet = Arc::new(MemorySheet::new());
    sheet
        .fail_next(
            Operation::AllRows,
            1,
            StoreError::Unavailable("spreadsheet not found".into()),
        )
        .await;
    let sync = coordinator(&sheet);

    let err = sync.save(&client("c-1", "A")).await.expect_err("fatal");

    assert!(matches!(
        err,
        SyncError::Store {
            operation: "locate",
            source: StoreError::Unavailable(_),
        }
    ));
    assert_eq!(sheet.calls(Operation::AllRows).await, 1);
}

#[tokio::test(start_paused = true)]
async fn slow_calls_time_out_and_count_as_attempts() {
    let sheet = Arc::new(MemorySheet::new().with_latency(Duration::from_secs(5)));
    let config = SyncConfig {
        call_timeout_ms: 1_000,
        ..fast_config()
    };
    let sync = SyncCoordinator::new(Arc::clone(&sheet), schema(), config);

    let err = sync.locate("c-1").await.expect_err("every call times out");

    match err {
        SyncError::StoreUnavailable { attempts, reason, .. } => {
            assert_eq!(attempts, 4);
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn write_retries_do_not_duplicate_rows() {
    let sheet = Arc::new(MemorySheet::new());
    sheet.rate_limit_next(Operation::AppendRow, 2).await;
    sheet.rate_limit_next(Operation::WriteRow, 1).await;
    let sync = coordinator(&sheet);

    sync.save(&client("c-1", "A")).await.expect("retried");

    let rows = sheet.rows().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], sync.schema().header());
    assert_eq!(sheet.calls(Operation::AppendRow).await, 3);
}
