//! Keeps SIGEC client records in sync with the client worksheet.
//!
//! [`SyncCoordinator`] locates a record's row by id and either overwrites it
//! or appends a new one, serialising writers per id and retrying transient
//! store failures. The worksheet itself sits behind the [`SheetStore`]
//! trait; [`MemorySheet`] is the in-process implementation.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod memory;
pub mod retry;
pub mod store;

pub use config::{ConfigLoader, HeaderPolicy, SyncConfig};
pub use coordinator::{HEADER_ROW, SaveOutcome, StoredClient, SyncCoordinator};
pub use error::{Result, SyncError};
pub use memory::{MemorySheet, Operation};
pub use retry::RetryConfig;
pub use store::{SheetStore, StoreError};
