//! Typed client record

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Name of the identity field every record carries.
pub const ID_FIELD: &str = "id";

/// One occupied slot of a repeating group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupInstance {
    /// 1-based slot.
    pub index: u32,
    /// Attribute name (`cpf`) to value.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl GroupInstance {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter; blank text is treated as absent.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if value.is_blank() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A client as seen by the application: scalar fields plus the occupied
/// slots of each repeating group, sorted by slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<GroupInstance>>,
}

impl ClientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.set(ID_FIELD, FieldValue::Text(id.into()));
        record
    }

    /// Identity, when assigned.
    pub fn id(&self) -> Option<&str> {
        self.fields
            .get(ID_FIELD)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Set a scalar field. Blank text removes it.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if value.is_blank() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Occupied slots of `group`, sorted by slot.
    pub fn group(&self, group: &str) -> &[GroupInstance] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn instance(&self, group: &str, index: u32) -> Option<&GroupInstance> {
        self.group(group).iter().find(|i| i.index == index)
    }

    /// The instance in slot `index`, created empty when missing.
    pub fn instance_mut(&mut self, group: &str, index: u32) -> &mut GroupInstance {
        let instances = self.groups.entry(group.to_string()).or_default();
        let at = match instances.binary_search_by_key(&index, |i| i.index) {
            Ok(at) => at,
            Err(at) => {
                instances.insert(at, GroupInstance::new(index));
                at
            }
        };
        &mut instances[at]
    }

    /// Set one attribute of slot `index` of `group`.
    pub fn set_group_field(
        &mut self,
        group: &str,
        index: u32,
        field: &str,
        value: impl Into<FieldValue>,
    ) {
        self.instance_mut(group, index).set(field, value);
    }

    /// Add `instance` as given, keeping slot order. Unlike
    /// [`ClientRecord::instance_mut`] this does not merge slots, so a record
    /// assembled this way may claim one slot twice; the encoder rejects that.
    pub fn push_instance(&mut self, group: &str, instance: GroupInstance) {
        let instances = self.groups.entry(group.to_string()).or_default();
        let at = instances.partition_point(|i| i.index <= instance.index);
        instances.insert(at, instance);
    }

    /// Drop empty instances and groups left without any.
    pub fn prune(&mut self) {
        for instances in self.groups.values_mut() {
            instances.retain(|i| !i.is_empty());
        }
        self.groups.retain(|_, instances| !instances.is_empty());
    }
}
