#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use std::sync::Arc;

use sigec_codec::{ClientRecord, Row, SchemaRegistry, client_schema};
use sigec_store::{HeaderPolicy, MemorySheet, RetryConfig, SyncConfig, SyncCoordinator};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn schema() -> Arc<SchemaRegistry> {
    Arc::new(client_schema().expect("client schema is valid"))
}

/// Short, deterministic backoff so paused-clock tests stay fast.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        retry: RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
            backoff_multiplier: 2.0,
            jitter: false,
        },
        call_timeout_ms: 1_000,
        header_policy: HeaderPolicy::Strict,
    }
}

pub fn coordinator(sheet: &Arc<MemorySheet>) -> SyncCoordinator<MemorySheet> {
    init_tracing();
    SyncCoordinator::new(Arc::clone(sheet), schema(), fast_config())
}

pub fn client(id: &str, company: &str) -> ClientRecord {
    let mut record = ClientRecord::with_id(id);
    record.set("nome_empresa", company);
    record
}

/// What the sheet keeps of a written row.
pub fn stored(mut row: Row) -> Row {
    while row.last().is_some_and(String::is_empty) {
        row.pop();
    }
    row
}
