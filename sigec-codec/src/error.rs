//! Error types for schema and codec operations

use thiserror::Error;

use crate::value::ValueKind;

/// Codec result type alias
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema and codec error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("no column at position {position} (schema width {width})")]
    UnknownPosition { position: usize, width: usize },

    #[error("schema integrity violation: {0}")]
    SchemaIntegrity(String),

    #[error("instance {instance} out of range for group '{group}' (1..={max_instances})")]
    OutOfRange {
        group: String,
        instance: u32,
        max_instances: u32,
    },

    #[error("field index {field_index} out of range for group '{group}' (1..={stride})")]
    FieldIndexOutOfRange {
        group: String,
        field_index: usize,
        stride: usize,
    },

    #[error("required field '{0}' is missing")]
    RequiredFieldMissing(String),

    #[error("field '{field}' expects {expected} but got {found}")]
    KindMismatch {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("group '{group}' has more than one instance in slot {instance}")]
    DuplicateInstance { group: String, instance: u32 },

    #[error("field '{0}' holds a number that is not finite")]
    NonFiniteNumber(String),
}

impl SchemaError {
    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        SchemaError::SchemaIntegrity(message.into())
    }

    /// Whether the error describes bad caller input (surfaced as a form
    /// validation failure) rather than a malformed schema.
    pub fn is_validation_failure(&self) -> bool {
        !matches!(self, SchemaError::SchemaIntegrity(_))
    }
}
