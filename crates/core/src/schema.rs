//! Collection schema and its wire codec
//!
//! Schemas travel inside CreateCollection messages as an opaque MessagePack
//! blob. The blob is decoded exactly once, when the collection is added to the
//! replica, and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Element type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean scalar
    Bool,
    /// 8-bit integer
    Int8,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Packed binary vector; `dim` lives in `type_params`
    BinaryVector,
    /// f32 vector; `dim` lives in `type_params`
    FloatVector,
}

/// One field of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field id, unique within the collection
    pub field_id: i64,
    /// Field name
    pub name: String,
    /// Whether this is the primary key
    #[serde(default)]
    pub is_primary_key: bool,
    /// Element type
    pub data_type: DataType,
    /// Free-form parameters such as `dim`
    #[serde(default)]
    pub type_params: BTreeMap<String, String>,
}

/// Schema of a collection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether primary keys are assigned by the system
    #[serde(default)]
    pub auto_id: bool,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    /// Create an empty schema with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Serialize to the MessagePack blob carried by CreateCollection.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode a blob produced by [`CollectionSchema::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}
