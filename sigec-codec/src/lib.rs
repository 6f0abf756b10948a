//! Schema-driven codec between SIGEC client records and spreadsheet rows.
//!
//! A [`SchemaRegistry`] is the only source of column positions. The
//! [`encode`] and [`decode`] functions translate between a typed
//! [`ClientRecord`] and a positional [`Row`] of cell text; both are pure and
//! never touch the store.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod a1;
pub mod client;
mod decode;
mod encode;
pub mod error;
pub mod flat;
pub mod record;
mod resolver;
pub mod schema;
pub mod value;

pub use a1::{column_letter, row_range};
pub use client::{CLIENT_SCHEMA_VERSION, CLIENT_SHEET, client_schema};
pub use decode::decode;
pub use encode::encode;
pub use error::{Result, SchemaError};
pub use flat::{from_flat, to_flat};
pub use record::{ClientRecord, GroupInstance, ID_FIELD};
pub use resolver::group_position;
pub use schema::{
    ColumnDefinition, GroupLayout, GroupRef, SchemaBuilder, SchemaRegistry, verify_append_only,
};
pub use value::{BooleanSentinels, FieldValue, ValueKind};

/// Raw cell text in column order; index 0 holds column 1.
pub type Row = Vec<String>;
