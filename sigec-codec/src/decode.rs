//! Row → record decoding

use crate::record::ClientRecord;
use crate::schema::SchemaRegistry;
use crate::value::parse_cell;

/// Decode a stored row. Total: never fails.
///
/// Cells past the end of a short row read as empty and cells beyond the
/// schema width are ignored. A group slot appears in the record only when
/// at least one of its cells is non-empty, and it keeps its slot index.
pub fn decode<S: AsRef<str>>(row: &[S], schema: &SchemaRegistry) -> ClientRecord {
    if row.len() > schema.width() {
        tracing::debug!(
            cells = row.len(),
            width = schema.width(),
            "Ignoring cells beyond schema width"
        );
    }

    let sentinels = schema.sentinels();
    let mut record = ClientRecord::new();
    for column in schema.columns() {
        let raw = row
            .get(column.position - 1)
            .map(AsRef::as_ref)
            .unwrap_or_default();
        let Some(value) = parse_cell(raw, column.kind, sentinels) else {
            continue;
        };
        match (&column.group, column.instance) {
            (Some(group), Some(instance)) => {
                record.set_group_field(&group.group_name, instance, &group.field_name, value);
            }
            _ => record.set(&column.name, value),
        }
    }
    record
}
