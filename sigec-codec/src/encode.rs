//! Record → row encoding

use crate::Row;
use crate::error::{Result, SchemaError};
use crate::record::ClientRecord;
use crate::schema::SchemaRegistry;
use crate::value::{FieldValue, ValueKind, render_cell};

/// Encode `record` into a row of exactly `schema.width()` cells.
///
/// Absent optional data becomes an empty cell. Fails when a required field
/// is missing, when the record names a field or group the schema does not
/// know, when a group slot is out of range or claimed twice, or when a value
/// does not fit its column kind. Text fits every column; numbers must be
/// finite.
pub fn encode(record: &ClientRecord, schema: &SchemaRegistry) -> Result<Row> {
    let sentinels = schema.sentinels();
    let mut row = vec![String::new(); schema.width()];

    for (name, value) in &record.fields {
        let column = schema.column_named(name)?;
        if column.is_grouped() {
            return Err(SchemaError::UnknownField(name.clone()));
        }
        check_kind(name, column.kind, value)?;
        row[column.position - 1] = render_cell(value, sentinels);
    }

    for column in schema.scalars().filter(|c| c.required) {
        let present = record
            .get(&column.name)
            .is_some_and(|value| !render_cell(value, sentinels).trim().is_empty());
        if !present {
            return Err(SchemaError::RequiredFieldMissing(column.name.clone()));
        }
    }

    for (group, instances) in &record.groups {
        let layout = schema.group(group)?;
        let mut previous = None;
        for instance in instances {
            if previous == Some(instance.index) {
                return Err(SchemaError::DuplicateInstance {
                    group: group.clone(),
                    instance: instance.index,
                });
            }
            previous = Some(instance.index);

            for (field_name, value) in &instance.fields {
                let field = layout
                    .field(field_name)
                    .ok_or_else(|| SchemaError::UnknownField(format!("{group}.{field_name}")))?;
                let position = layout.position(instance.index, field.field_index)?;
                let column = schema.column(position)?;
                check_kind(&column.name, column.kind, value)?;
                row[position - 1] = render_cell(value, sentinels);
            }
        }
    }

    Ok(row)
}

fn check_kind(field: &str, expected: ValueKind, value: &FieldValue) -> Result<()> {
    if let FieldValue::Number(n) = value
        && !n.is_finite()
    {
        return Err(SchemaError::NonFiniteNumber(field.to_string()));
    }
    let found = value.kind();
    if found == expected || found == ValueKind::Text {
        Ok(())
    } else {
        Err(SchemaError::KindMismatch {
            field: field.to_string(),
            expected,
            found,
        })
    }
}
