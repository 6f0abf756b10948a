//! Repeated-Group Resolver
//!
//! [`group_position`] is the only place a group column position is computed.
//! Registry validation, the schema builder, the encoder and the decoder all
//! go through it.

use crate::error::{Result, SchemaError};
use crate::schema::{GroupLayout, SchemaRegistry};

/// `base_offset + (instance-1)*stride + field_index`
pub fn group_position(base_offset: usize, stride: usize, instance: u32, field_index: usize) -> usize {
    base_offset + (instance as usize).saturating_sub(1) * stride + field_index
}

impl GroupLayout {
    /// Absolute position of attribute `field_index` in slot `instance`.
    pub fn position(&self, instance: u32, field_index: usize) -> Result<usize> {
        if instance == 0 || instance > self.max_instances {
            return Err(SchemaError::OutOfRange {
                group: self.name.clone(),
                instance,
                max_instances: self.max_instances,
            });
        }
        if field_index == 0 || field_index > self.stride {
            return Err(SchemaError::FieldIndexOutOfRange {
                group: self.name.clone(),
                field_index,
                stride: self.stride,
            });
        }
        Ok(group_position(self.base_offset, self.stride, instance, field_index))
    }
}

impl SchemaRegistry {
    /// Absolute position of `(group, instance, field_index)`.
    pub fn resolve(&self, group: &str, instance: u32, field_index: usize) -> Result<usize> {
        self.group(group)?.position(instance, field_index)
    }

    /// Same as [`SchemaRegistry::resolve`], addressing the attribute by name.
    pub fn resolve_field(&self, group: &str, instance: u32, field_name: &str) -> Result<usize> {
        let layout = self.group(group)?;
        let field = layout
            .field(field_name)
            .ok_or_else(|| SchemaError::UnknownField(format!("{group}.{field_name}")))?;
        layout.position(instance, field.field_index)
    }
}
