//! Reflected table and column descriptors.
//!
//! These are produced by an external schema-reflection collaborator and
//! consumed read-only by the gateway; nothing here talks to a database.
//! Type tags are dialect-neutral names (`integer`, `varchar`, `boolean`,
//! `timestamp`, ...), the way the reflection layer normalizes them.

use serde::{Deserialize, Serialize};

/// A single reflected column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Dialect-neutral type tag, e.g. "integer", "varchar", "boolean"
    pub type_tag: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
}

impl ColumnDescriptor {
    /// Create a descriptor without length/precision information.
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            nullable,
            length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.type_tag == "boolean" || self.type_tag == "bit"
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.type_tag.as_str(),
            "integer" | "bigint" | "smallint" | "tinyint"
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self.type_tag.as_str(), "float" | "double" | "real")
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.type_tag.as_str(), "blob" | "varbinary" | "binary")
    }

    pub fn is_uuid(&self) -> bool {
        self.type_tag == "uuid" || self.type_tag == "uniqueidentifier"
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self.type_tag.as_str(), "date" | "time" | "timestamp")
    }
}

/// A reflected table: name, ordered columns and the primary-key column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<ColumnDescriptor>,
    pk: String,
}

impl TableDescriptor {
    /// Build a descriptor. `pk` must name one of `columns`; this is the
    /// reflection collaborator's contract, not re-validated per call.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        pk: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            pk: pk.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Ordered column names.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// The primary-key column descriptor, if the designated column exists.
    /// The reflection collaborator guarantees it does; the gateway still
    /// reports a missing one as an invalid operation rather than panicking.
    pub fn pk(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == self.pk)
    }

    pub fn pk_name(&self) -> &str {
        &self.pk
    }
}
