//! Row locator and update coordinator
//!
//! Each request runs `LOCATE → {UPDATE | APPEND}` while holding the lock for
//! its record id. LOCATE reads one snapshot of the sheet, checks the header
//! against the schema and scans the id column. Every store call goes through
//! the retry strategy with a per-call timeout.
//!
//! Deleting a row shifts every row below it, so a delete holds the row layout
//! lock exclusively while saves share it between LOCATE and their write.

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use sigec_codec::client::CREATED_AT_FIELD;
use sigec_codec::{
    ClientRecord, FieldValue, ID_FIELD, Row, SchemaError, SchemaRegistry, ValueKind, decode,
    encode,
};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::{HeaderPolicy, SyncConfig};
use crate::error::{Result, SyncError};
use crate::locks::IdLocks;
use crate::retry::execute_with_backoff;
use crate::store::{SheetStore, StoreError};

/// Row number of the header.
pub const HEADER_ROW: usize = 1;

/// Result of [`SyncCoordinator::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// An existing row was overwritten.
    Updated { row: usize },
    /// The record was added as a new row.
    Appended,
}

/// A decoded record with the sheet row it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredClient {
    pub row: usize,
    pub record: ClientRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    Current,
    Missing,
    /// Strict prefix of the schema header, accepted under
    /// [`HeaderPolicy::ExtendPrefix`].
    Outdated,
}

pub struct SyncCoordinator<S: ?Sized> {
    store: Arc<S>,
    schema: Arc<SchemaRegistry>,
    config: SyncConfig,
    locks: IdLocks,
    /// Shared by located writes, exclusive for row-shifting deletes.
    layout: RwLock<()>,
    cancel: Option<CancellationToken>,
}

impl<S> SyncCoordinator<S>
where
    S: SheetStore + ?Sized,
{
    pub fn new(store: Arc<S>, schema: Arc<SchemaRegistry>, config: SyncConfig) -> Self {
        Self {
            store,
            schema,
            config,
            locks: IdLocks::new(),
            layout: RwLock::new(()),
            cancel: None,
        }
    }

    /// Stop issuing store calls once `token` is cancelled. A write that has
    /// already been sent still completes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Update the row holding `record`'s id, or append a new row.
    pub async fn save(&self, record: &ClientRecord) -> Result<SaveOutcome> {
        let id = record
            .id()
            .ok_or_else(|| SchemaError::RequiredFieldMissing(ID_FIELD.to_string()))?;
        let mut row = encode(record, &self.schema)?;

        let _guard = self.locks.acquire(id).await;
        let _layout = self.layout.read().await;
        let snapshot = self.snapshot().await?;
        let header = self.inspect_header(snapshot.first())?;

        match self.find_row(&snapshot, id)? {
            Some(position) => {
                self.preserve_stored_cells(record, &mut row, &snapshot[position - 1]);
                self.ensure_header(header).await?;
                self.checkpoint()?;
                tracing::debug!(id, row = position, "Updating client row");
                self.call("update", || self.store.write_row(position, row.clone()))
                    .await?;
                Ok(SaveOutcome::Updated { row: position })
            }
            None => {
                self.ensure_header(header).await?;
                self.checkpoint()?;
                tracing::debug!(id, "Appending client row");
                self.call("append", || self.store.append_row(row.clone()))
                    .await?;
                Ok(SaveOutcome::Appended)
            }
        }
    }

    /// Assign an id and creation time when missing, then save.
    ///
    /// Returns the id the record was stored under.
    pub async fn create(&self, record: &ClientRecord) -> Result<(String, SaveOutcome)> {
        let mut record = record.clone();
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                record.set(ID_FIELD, id.as_str());
                id
            }
        };
        if let Ok(created_at) = self.schema.column_named(CREATED_AT_FIELD)
            && created_at.kind == ValueKind::Timestamp
            && !record.contains(CREATED_AT_FIELD)
        {
            record.set(
                CREATED_AT_FIELD,
                FieldValue::Timestamp(Local::now().naive_local()),
            );
        }
        let outcome = self.save(&record).await?;
        Ok((id, outcome))
    }

    /// Row number holding `id`, if any.
    pub async fn locate(&self, id: &str) -> Result<Option<usize>> {
        let id = require_id(id)?;
        let snapshot = self.snapshot().await?;
        self.inspect_header(snapshot.first())?;
        self.find_row(&snapshot, id)
    }

    pub async fn fetch(&self, id: &str) -> Result<Option<StoredClient>> {
        let id = require_id(id)?;
        let snapshot = self.snapshot().await?;
        self.inspect_header(snapshot.first())?;
        Ok(self.find_row(&snapshot, id)?.map(|row| StoredClient {
            row,
            record: decode(&snapshot[row - 1], &self.schema),
        }))
    }

    /// Every data row that carries an id, in sheet order.
    pub async fn list(&self) -> Result<Vec<StoredClient>> {
        let snapshot = self.snapshot().await?;
        self.inspect_header(snapshot.first())?;
        Ok(snapshot
            .iter()
            .enumerate()
            .skip(HEADER_ROW)
            .filter_map(|(index, cells)| {
                let record = decode(cells, &self.schema);
                record.id().is_some().then_some(StoredClient {
                    row: index + 1,
                    record,
                })
            })
            .collect())
    }

    /// Remove the row holding `id`. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = require_id(id)?;
        let _guard = self.locks.acquire(id).await;
        let _layout = self.layout.write().await;
        let snapshot = self.snapshot().await?;
        self.inspect_header(snapshot.first())?;
        let Some(position) = self.find_row(&snapshot, id)? else {
            return Ok(false);
        };
        self.checkpoint()?;
        tracing::debug!(id, row = position, "Deleting client row");
        self.call("delete", || self.store.delete_row(position)).await?;
        Ok(true)
    }

    /// Check the sheet header, writing it when the sheet has none (or, under
    /// [`HeaderPolicy::ExtendPrefix`], when it is an older prefix).
    pub async fn ensure_header_row(&self) -> Result<()> {
        let header = self.call("read_header", || self.store.header_row()).await?;
        let state = self.inspect_header(Some(&header))?;
        self.ensure_header(state).await
    }

    async fn snapshot(&self) -> Result<Vec<Row>> {
        self.checkpoint()?;
        self.call("locate", || self.store.all_rows()).await
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Run one store call under the retry schedule and per-call timeout.
    async fn call<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        let timeout = self.config.call_timeout();
        execute_with_backoff(operation, &self.config.retry, self.cancel.as_ref(), || {
            let call = op();
            async move {
                tokio::time::timeout(timeout, call)
                    .await
                    .unwrap_or(Err(StoreError::Timeout))
            }
        })
        .await
        .map_err(|err| SyncError::from_retry(operation, err))
    }

    fn inspect_header(&self, header: Option<&Row>) -> Result<HeaderState> {
        let found: Vec<&str> = header
            .map(|cells| cells.iter().map(|c| c.trim()).collect())
            .unwrap_or_default();
        let found = trim_trailing(&found);
        if found.is_empty() {
            return Ok(HeaderState::Missing);
        }

        let expected = self.schema.header();
        for (index, cell) in found.iter().enumerate() {
            let wanted = expected.get(index).map(String::as_str).unwrap_or_default();
            if *cell != wanted {
                return Err(SyncError::SchemaMismatch {
                    position: index + 1,
                    expected: wanted.to_string(),
                    found: (*cell).to_string(),
                });
            }
        }
        if found.len() == expected.len() {
            return Ok(HeaderState::Current);
        }

        match self.config.header_policy {
            HeaderPolicy::ExtendPrefix => Ok(HeaderState::Outdated),
            HeaderPolicy::Strict => {
                let position = found.len() + 1;
                Err(SyncError::SchemaMismatch {
                    position,
                    expected: expected[position - 1].clone(),
                    found: String::new(),
                })
            }
        }
    }

    async fn ensure_header(&self, state: HeaderState) -> Result<()> {
        match state {
            HeaderState::Current => return Ok(()),
            HeaderState::Missing => {
                tracing::info!(version = self.schema.version(), "Writing sheet header");
            }
            HeaderState::Outdated => {
                tracing::info!(
                    version = self.schema.version(),
                    width = self.schema.width(),
                    "Extending sheet header to current schema"
                );
            }
        }
        self.checkpoint()?;
        let header = self.schema.header();
        self.call("write_header", || {
            self.store.write_row(HEADER_ROW, header.clone())
        })
        .await
    }

    /// Scan the id column of the data rows for `id`.
    fn find_row(&self, snapshot: &[Row], id: &str) -> Result<Option<usize>> {
        let id_column = self.schema.column_for(ID_FIELD)?;
        let wanted = id.trim();
        let mut matches = snapshot
            .iter()
            .enumerate()
            .skip(HEADER_ROW)
            .filter(|(_, cells)| {
                cells
                    .get(id_column - 1)
                    .is_some_and(|cell| cell.trim() == wanted)
            })
            .map(|(index, _)| index + 1);

        let found = matches.next();
        if let Some(row) = found
            && let Some(duplicate) = matches.next()
        {
            tracing::warn!(id = wanted, row, duplicate, "Id appears on more than one row");
        }
        tracing::debug!(id = wanted, row = ?found, rows = snapshot.len(), "Located client");
        Ok(found)
    }

    /// Copy write-once cells from the stored row when the record omits them.
    fn preserve_stored_cells(&self, record: &ClientRecord, row: &mut Row, stored: &Row) {
        for column in self
            .schema
            .scalars()
            .filter(|c| c.preserve_on_update && !record.contains(&c.name))
        {
            if let Some(cell) = stored.get(column.position - 1) {
                row[column.position - 1] = cell.clone();
            }
        }
    }
}

/// Trimmed lookup key; a blank id never names a row.
fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SchemaError::RequiredFieldMissing(ID_FIELD.to_string()).into());
    }
    Ok(id)
}

fn trim_trailing<'a, 'b>(cells: &'b [&'a str]) -> &'b [&'a str] {
    let end = cells
        .iter()
        .rposition(|c| !c.is_empty())
        .map_or(0, |last| last + 1);
    &cells[..end]
}
