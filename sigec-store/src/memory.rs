//! In-memory sheet store
//!
//! Behaves like the spreadsheet API where it matters to the coordinator:
//! trailing blank cells are dropped, rows are 1-based and the header is
//! row 1. Calls are counted per operation, and faults and latency can be
//! injected.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use sigec_codec::Row;
use tokio::sync::{Mutex, MutexGuard};

use crate::store::{SheetStore, StoreError};

/// Store call kinds, for counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    HeaderRow,
    AllRows,
    WriteRow,
    AppendRow,
    DeleteRow,
}

#[derive(Debug, Default)]
struct SheetState {
    rows: Vec<Row>,
    calls: HashMap<Operation, usize>,
    faults: HashMap<Operation, VecDeque<StoreError>>,
}

#[derive(Debug, Default)]
pub struct MemorySheet {
    state: Mutex<SheetState>,
    latency: Option<Duration>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sheet; `rows[0]` is the header.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let rows = rows.into_iter().map(trim_trailing_blanks).collect();
        Self {
            state: Mutex::new(SheetState {
                rows,
                ..SheetState::default()
            }),
            latency: None,
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `times` calls of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: Operation, times: usize, error: StoreError) {
        let mut state = self.state.lock().await;
        let queue = state.faults.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(error, times));
    }

    /// Shorthand for rate-limiting the next `times` calls of `operation`.
    pub async fn rate_limit_next(&self, operation: Operation, times: usize) {
        self.fail_next(operation, times, StoreError::RateLimited { retry_after: None })
            .await;
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        let state = self.state.lock().await;
        state.calls.get(&operation).copied().unwrap_or_default()
    }

    /// Calls that changed the sheet.
    pub async fn writes(&self) -> usize {
        let state = self.state.lock().await;
        [Operation::WriteRow, Operation::AppendRow, Operation::DeleteRow]
            .iter()
            .filter_map(|op| state.calls.get(op))
            .sum()
    }

    /// Snapshot of every row, header first.
    pub async fn rows(&self) -> Vec<Row> {
        self.state.lock().await.rows.clone()
    }

    async fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, SheetState>, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        *state.calls.entry(operation).or_default() += 1;
        if let Some(err) = state.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            tracing::debug!(?operation, error = %err, "Injected store fault");
            return Err(err);
        }
        Ok(state)
    }
}

fn trim_trailing_blanks(mut row: Row) -> Row {
    while row.last().is_some_and(|cell| cell.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn header_row(&self) -> Result<Row, StoreError> {
        let state = self.begin(Operation::HeaderRow).await?;
        Ok(state.rows.first().cloned().unwrap_or_default())
    }

    async fn all_rows(&self) -> Result<Vec<Row>, StoreError> {
        let state = self.begin(Operation::AllRows).await?;
        Ok(state.rows.clone())
    }

    async fn write_row(&self, position: usize, row: Row) -> Result<(), StoreError> {
        if position == 0 {
            return Err(StoreError::Unavailable("row 0 does not exist".into()));
        }
        let mut state = self.begin(Operation::WriteRow).await?;
        if state.rows.len() < position {
            state.rows.resize(position, Vec::new());
        }
        state.rows[position - 1] = trim_trailing_blanks(row);
        Ok(())
    }

    async fn append_row(&self, row: Row) -> Result<(), StoreError> {
        let mut state = self.begin(Operation::AppendRow).await?;
        state.rows.push(trim_trailing_blanks(row));
        Ok(())
    }

    async fn delete_row(&self, position: usize) -> Result<(), StoreError> {
        let mut state = self.begin(Operation::DeleteRow).await?;
        if position == 0 || position > state.rows.len() {
            return Err(StoreError::Unavailable(format!(
                "row {position} does not exist"
            )));
        }
        state.rows.remove(position - 1);
        Ok(())
    }
}
