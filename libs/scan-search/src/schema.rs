//! Field schema registries
//!
//! A registry is the whitelist of queryable fields for one entity: public
//! field name -> backend-native names + expected value kind. Registries are
//! declared once at startup and are read-only afterwards; share them behind
//! an `Arc`.
//!
//! ```
//! use shiryoku_search::schema::{FieldDescriptor, FieldRegistry, ValueKind};
//!
//! let hosts = FieldRegistry::builder("hosts")
//!     .string("host")
//!     .field(FieldDescriptor::new("status", ValueKind::String).column("h.host_status"))
//!     .number("os_accuracy")
//!     .build();
//!
//! assert_eq!(hosts.get("status").unwrap().column, "h.host_status");
//! ```

use crate::model::FilterValue;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// JSON-level value kind. Integer and float fields are both `Number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Bool,
}

impl ValueKind {
    /// Whether a scalar value can be compared with a field of this kind.
    /// `null` is accepted for every kind.
    pub fn accepts(self, value: &FilterValue) -> bool {
        match value {
            FilterValue::Null => true,
            FilterValue::String(_) => self == ValueKind::String,
            FilterValue::Number(_) => self == ValueKind::Number,
            FilterValue::Bool(_) => self == ValueKind::Bool,
            FilterValue::Sequence(_) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queryable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Public name used on the wire.
    pub name: String,
    /// Relational column, optionally table-qualified (`h.host_status`).
    pub column: String,
    /// Document attribute path (`service.name`).
    pub attribute: String,
    pub kind: ValueKind,
}

impl FieldDescriptor {
    /// Column and attribute default to the public name.
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            column: name.to_string(),
            attribute: name.to_string(),
            kind,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    pub fn attribute(mut self, attribute: &str) -> Self {
        self.attribute = attribute.to_string();
        self
    }
}

/// Immutable field whitelist for one entity.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    entity: String,
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
}

impl FieldRegistry {
    pub fn builder(entity: &str) -> FieldRegistryBuilder {
        FieldRegistryBuilder {
            entity: entity.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `field -> kind` listing in declaration order, for error responses and
    /// tooling.
    pub fn describe(&self) -> Vec<(&str, ValueKind)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.kind))
            .collect()
    }
}

pub struct FieldRegistryBuilder {
    entity: String,
    fields: Vec<FieldDescriptor>,
}

impl FieldRegistryBuilder {
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn string(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::String))
    }

    pub fn number(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Number))
    }

    pub fn bool(self, name: &str) -> Self {
        self.field(FieldDescriptor::new(name, ValueKind::Bool))
    }

    /// Later declarations of the same public name replace earlier ones.
    pub fn build(self) -> FieldRegistry {
        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(self.fields.len());
        let mut by_name = HashMap::with_capacity(self.fields.len());
        for descriptor in self.fields {
            if let Some(&i) = by_name.get(&descriptor.name) {
                tracing::warn!(
                    entity = %self.entity,
                    field = %descriptor.name,
                    "Duplicate field declaration, keeping the last one"
                );
                fields[i] = descriptor;
                continue;
            }
            by_name.insert(descriptor.name.clone(), fields.len());
            fields.push(descriptor);
        }
        FieldRegistry {
            entity: self.entity,
            fields,
            by_name,
        }
    }
}

/// Look a field up across registries in priority order; first match wins.
pub fn resolve_field<'a>(
    registries: &[&'a FieldRegistry],
    name: &str,
) -> Option<&'a FieldDescriptor> {
    registries.iter().find_map(|r| r.get(name))
}
