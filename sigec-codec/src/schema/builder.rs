use crate::error::{Result, SchemaError};
use crate::resolver::group_position;
use crate::schema::{ColumnDefinition, GroupRef, SchemaRegistry, verify_append_only};
use crate::value::{BooleanSentinels, ValueKind};

/// A column declaration: `(name, kind)`.
pub type FieldSpec<'a> = (&'a str, ValueKind);

/// One attribute of a repeating group.
pub type GroupField<'a> = FieldSpec<'a>;

/// Assigns positions sequentially so layouts are declared by order, never by
/// literal column number.
///
/// ```
/// use sigec_codec::{SchemaBuilder, ValueKind};
///
/// let schema = SchemaBuilder::new(1)
///     .scalar("id", ValueKind::Text)
///     .required()
///     .group("partner", 2, &[("nome", ValueKind::Text), ("cpf", ValueKind::Text)])
///     .build()?;
/// assert_eq!(schema.column_for("partner_2_cpf")?, 5);
/// # Ok::<(), sigec_codec::SchemaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    version: u32,
    sentinels: BooleanSentinels,
    columns: Vec<ColumnDefinition>,
    base: Option<SchemaRegistry>,
    deferred: Option<SchemaError>,
}

impl SchemaBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            sentinels: BooleanSentinels::default(),
            columns: Vec::new(),
            base: None,
            deferred: None,
        }
    }

    /// Start a new version from `base`. Only appends are possible; `build`
    /// re-checks the result with [`verify_append_only`].
    pub fn extending(base: &SchemaRegistry, version: u32) -> Self {
        Self {
            version,
            sentinels: base.sentinels().clone(),
            columns: base.columns().to_vec(),
            base: Some(base.clone()),
            deferred: None,
        }
    }

    pub fn sentinels(mut self, sentinels: BooleanSentinels) -> Self {
        self.sentinels = sentinels;
        self
    }

    fn next_position(&self) -> usize {
        self.columns.len() + 1
    }

    /// Append a non-grouped column.
    pub fn scalar(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        let position = self.next_position();
        self.columns.push(ColumnDefinition::scalar(position, name, kind));
        self
    }

    /// Mark the last appended column as required.
    pub fn required(self) -> Self {
        self.flag_last("required", |c| c.required = true)
    }

    /// Mark the last appended column as kept across updates that omit it.
    pub fn preserve_on_update(self) -> Self {
        self.flag_last("preserve_on_update", |c| c.preserve_on_update = true)
    }

    fn flag_last(mut self, flag: &str, apply: impl FnOnce(&mut ColumnDefinition)) -> Self {
        let base_width = self.base.as_ref().map_or(0, SchemaRegistry::width);
        match self.columns.last_mut() {
            Some(column) if column.is_grouped() => {
                self.deferred.get_or_insert(SchemaError::integrity(format!(
                    "{flag} applies to scalar columns, not '{}'",
                    column.name
                )));
            }
            Some(column) if column.position > base_width => apply(column),
            _ => {
                self.deferred.get_or_insert(SchemaError::integrity(format!(
                    "{flag} needs a newly appended column"
                )));
            }
        }
        self
    }

    /// Append a repeating group with `max_instances` slots of `fields`.
    ///
    /// Columns are named `{group}_{slot}_{field}`.
    pub fn group(mut self, name: &str, max_instances: u32, fields: &[GroupField<'_>]) -> Self {
        let base_offset = self.columns.len();
        let stride = fields.len();
        for instance in 1..=max_instances {
            for (index, (field_name, kind)) in fields.iter().enumerate() {
                let field_index = index + 1;
                let group = GroupRef {
                    group_name: name.to_string(),
                    base_offset,
                    stride,
                    field_index,
                    max_instances,
                    field_name: (*field_name).to_string(),
                };
                let position = group_position(base_offset, stride, instance, field_index);
                self.columns.push(ColumnDefinition::grouped(
                    position,
                    format!("{name}_{instance}_{field_name}"),
                    *kind,
                    group,
                    instance,
                ));
            }
        }
        self
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        let registry = SchemaRegistry::new(self.version, self.sentinels, self.columns)?;
        if let Some(base) = &self.base {
            verify_append_only(base, &registry)?;
        }
        Ok(registry)
    }
}
