//! Schema Registry
//!
//! An ordered, versioned catalog of column definitions. Every column position
//! used anywhere in the workspace comes from a [`SchemaRegistry`]; nothing
//! else carries literal column numbers.
//!
//! A registry is immutable once built. Evolving the sheet layout means
//! building a new version with [`SchemaBuilder::extending`], which can only
//! append columns.

mod builder;
mod evolution;

pub use builder::{FieldSpec, GroupField, SchemaBuilder};
pub use evolution::verify_append_only;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::resolver::group_position;
use crate::value::{BooleanSentinels, ValueKind};

/// Membership of a column in a repeating group.
///
/// Describes the `field_index`-th attribute of the group; instance `k`
/// of that attribute lives at `base_offset + (k-1)*stride + field_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub group_name: String,
    /// Position of the column right before the group's block.
    pub base_offset: usize,
    /// Columns per instance.
    pub stride: usize,
    /// 1-based index of the attribute within an instance.
    pub field_index: usize,
    pub max_instances: u32,
    /// Attribute name within an instance (`cpf`, `email`).
    pub field_name: String,
}

/// One column of the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// 1-based column position.
    pub position: usize,
    /// Unique column name, also written to the header row.
    pub name: String,
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    /// 1-based instance slot; set exactly when `group` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<u32>,
    /// Encoding fails when the record has no value for this column.
    #[serde(default)]
    pub required: bool,
    /// An update without a value keeps the stored one.
    #[serde(default)]
    pub preserve_on_update: bool,
}

impl ColumnDefinition {
    pub fn scalar(position: usize, name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            position,
            name: name.into(),
            kind,
            group: None,
            instance: None,
            required: false,
            preserve_on_update: false,
        }
    }

    pub fn grouped(
        position: usize,
        name: impl Into<String>,
        kind: ValueKind,
        group: GroupRef,
        instance: u32,
    ) -> Self {
        Self {
            position,
            name: name.into(),
            kind,
            group: Some(group),
            instance: Some(instance),
            required: false,
            preserve_on_update: false,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    /// Whether two definitions bind the same slot of the sheet. Flags such as
    /// `required` may change between versions; layout may not.
    pub fn same_binding(&self, other: &ColumnDefinition) -> bool {
        self.position == other.position
            && self.name == other.name
            && self.kind == other.kind
            && self.group == other.group
            && self.instance == other.instance
    }
}

/// Layout of one repeating group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLayout {
    pub name: String,
    pub base_offset: usize,
    pub stride: usize,
    pub max_instances: u32,
    /// One entry per attribute, ordered by `field_index`.
    pub fields: Vec<GroupRef>,
}

impl GroupLayout {
    /// First and last column of the reserved block.
    pub fn span(&self) -> (usize, usize) {
        (
            self.base_offset + 1,
            self.base_offset + self.max_instances as usize * self.stride,
        )
    }

    pub fn field(&self, field_name: &str) -> Option<&GroupRef> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }
}

/// Immutable, validated column catalog for one schema version.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: u32,
    sentinels: BooleanSentinels,
    /// Index `i` holds the column at position `i + 1`.
    columns: Vec<ColumnDefinition>,
    by_name: HashMap<String, usize>,
    groups: BTreeMap<String, GroupLayout>,
}

impl SchemaRegistry {
    /// Validate `columns` and build a registry.
    ///
    /// Columns may be given in any order; positions must form `1..=N`.
    pub fn new(
        version: u32,
        sentinels: BooleanSentinels,
        mut columns: Vec<ColumnDefinition>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(SchemaError::integrity("schema has no columns"));
        }
        columns.sort_by_key(|c| c.position);

        let mut by_name = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let expected = index + 1;
            if column.position != expected {
                let reason = if index > 0 && column.position == columns[index - 1].position {
                    format!("position {} is assigned twice", column.position)
                } else {
                    format!(
                        "positions are not contiguous: expected {expected}, found {}",
                        column.position
                    )
                };
                return Err(SchemaError::integrity(reason));
            }
            if column.name.trim().is_empty() {
                return Err(SchemaError::integrity(format!(
                    "column at position {expected} has an empty name"
                )));
            }
            if by_name.insert(column.name.clone(), index).is_some() {
                return Err(SchemaError::integrity(format!(
                    "column name '{}' is used twice",
                    column.name
                )));
            }
        }

        let groups = collect_groups(&columns)?;

        tracing::debug!(
            version,
            width = columns.len(),
            groups = groups.len(),
            "Schema registry built"
        );

        Ok(Self {
            version,
            sentinels,
            columns,
            by_name,
            groups,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sentinels(&self) -> &BooleanSentinels {
        &self.sentinels
    }

    /// Number of columns (`N`).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// All columns in position order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column(&self, position: usize) -> Result<&ColumnDefinition> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .ok_or(SchemaError::UnknownPosition {
                position,
                width: self.width(),
            })
    }

    pub fn column_named(&self, name: &str) -> Result<&ColumnDefinition> {
        self.by_name
            .get(name)
            .map(|&index| &self.columns[index])
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
    }

    /// Position bound to `name`.
    pub fn column_for(&self, name: &str) -> Result<usize> {
        self.column_named(name).map(|c| c.position)
    }

    /// Name bound to `position`.
    pub fn field_for(&self, position: usize) -> Result<&str> {
        self.column(position).map(|c| c.name.as_str())
    }

    /// Attributes of `group`, ordered by field index.
    pub fn group_columns(&self, group: &str) -> Result<&[GroupRef]> {
        self.group(group).map(|g| g.fields.as_slice())
    }

    pub fn group(&self, group: &str) -> Result<&GroupLayout> {
        self.groups
            .get(group)
            .ok_or_else(|| SchemaError::UnknownField(group.to_string()))
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupLayout> {
        self.groups.values()
    }

    /// Non-grouped columns in position order.
    pub fn scalars(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| !c.is_grouped())
    }

    /// Column names in position order, as written to the header row.
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

fn collect_groups(columns: &[ColumnDefinition]) -> Result<BTreeMap<String, GroupLayout>> {
    let mut groups: BTreeMap<String, GroupLayout> = BTreeMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for column in columns {
        let (group, instance) = match (&column.group, column.instance) {
            (None, None) => continue,
            (Some(group), Some(instance)) => (group, instance),
            _ => {
                return Err(SchemaError::integrity(format!(
                    "column '{}' must set group and instance together",
                    column.name
                )));
            }
        };
        if column.required {
            return Err(SchemaError::integrity(format!(
                "group column '{}' cannot be required",
                column.name
            )));
        }
        if group.stride == 0 || group.max_instances == 0 {
            return Err(SchemaError::integrity(format!(
                "group '{}' needs a non-zero stride and instance count",
                group.group_name
            )));
        }
        if group.field_index == 0 || group.field_index > group.stride {
            return Err(SchemaError::integrity(format!(
                "column '{}' has field index {} outside 1..={}",
                column.name, group.field_index, group.stride
            )));
        }
        if instance == 0 || instance > group.max_instances {
            return Err(SchemaError::integrity(format!(
                "column '{}' has instance {instance} outside 1..={}",
                column.name, group.max_instances
            )));
        }
        let expected = group_position(group.base_offset, group.stride, instance, group.field_index);
        if column.position != expected {
            return Err(SchemaError::integrity(format!(
                "column '{}' sits at {} but group '{}' places it at {expected}",
                column.name, column.position, group.group_name
            )));
        }

        let layout = groups
            .entry(group.group_name.clone())
            .or_insert_with(|| GroupLayout {
                name: group.group_name.clone(),
                base_offset: group.base_offset,
                stride: group.stride,
                max_instances: group.max_instances,
                fields: Vec::new(),
            });
        if layout.base_offset != group.base_offset
            || layout.stride != group.stride
            || layout.max_instances != group.max_instances
        {
            return Err(SchemaError::integrity(format!(
                "group '{}' has inconsistent offset, stride or instance count",
                group.group_name
            )));
        }
        match layout.fields.iter().find(|f| f.field_index == group.field_index) {
            Some(known) if known.field_name != group.field_name => {
                return Err(SchemaError::integrity(format!(
                    "group '{}' field {} is named both '{}' and '{}'",
                    group.group_name, group.field_index, known.field_name, group.field_name
                )));
            }
            Some(_) => {}
            None => {
                if layout.field(&group.field_name).is_some() {
                    return Err(SchemaError::integrity(format!(
                        "group '{}' uses field name '{}' twice",
                        group.group_name, group.field_name
                    )));
                }
                layout.fields.push(group.clone());
            }
        }
        *counts.entry(group.group_name.clone()).or_default() += 1;
    }

    let kinds: HashMap<(String, usize), _> = columns
        .iter()
        .filter_map(|c| {
            c.group
                .as_ref()
                .map(|g| ((g.group_name.clone(), g.field_index), c.kind))
        })
        .collect();
    for column in columns {
        if let Some(group) = &column.group
            && kinds.get(&(group.group_name.clone(), group.field_index)) != Some(&column.kind)
        {
            return Err(SchemaError::integrity(format!(
                "group '{}' field '{}' changes kind between instances",
                group.group_name, group.field_name
            )));
        }
    }

    for layout in groups.values_mut() {
        layout.fields.sort_by_key(|f| f.field_index);
        let expected = layout.max_instances as usize * layout.stride;
        let found = counts.get(&layout.name).copied().unwrap_or_default();
        if found != expected || layout.fields.len() != layout.stride {
            return Err(SchemaError::integrity(format!(
                "group '{}' reserves {expected} columns but defines {found}",
                layout.name
            )));
        }
    }

    Ok(groups)
}
