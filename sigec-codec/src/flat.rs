//! Flat key-value view of a record
//!
//! Form handlers and templates work with plain `column name → text` maps.
//! Keys are the registry's column names, so `partner_2_cpf` addresses the
//! `cpf` attribute of partner slot 2.

use std::collections::BTreeMap;

use crate::encode::encode;
use crate::error::{Result, SchemaError};
use crate::record::ClientRecord;
use crate::schema::SchemaRegistry;
use crate::value::parse_cell;

/// Encoded cell text keyed by column name. Blank cells are omitted.
pub fn to_flat(record: &ClientRecord, schema: &SchemaRegistry) -> Result<BTreeMap<String, String>> {
    let row = encode(record, schema)?;
    Ok(schema
        .columns()
        .iter()
        .zip(row)
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(column, cell)| (column.name.clone(), cell))
        .collect())
}

/// Build a record from a submitted map.
///
/// Values are parsed with the same cell rules as stored rows, so a checkbox
/// posting `on` reads as `true`. Empty values are absent; a key the schema
/// does not know is [`SchemaError::UnknownField`].
pub fn from_flat<I, K, V>(entries: I, schema: &SchemaRegistry) -> Result<ClientRecord>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sentinels = schema.sentinels();
    let mut record = ClientRecord::new();
    for (key, value) in entries {
        let column = schema.column_named(key.as_ref())?;
        let Some(value) = parse_cell(value.as_ref().trim(), column.kind, sentinels) else {
            continue;
        };
        match (&column.group, column.instance) {
            (Some(group), Some(instance)) => {
                record.set_group_field(&group.group_name, instance, &group.field_name, value);
            }
            _ => record.set(&column.name, value),
        }
    }
    Ok(record)
}
