//! Dynamic values and dense column storage.
//!
//! Component values are held in a [`Column`], a closed set of densely packed
//! vectors (one variant per value kind). Which variant backs a component is
//! decided once, when its table is built, by a [`StorageProvider`] looking at
//! the component's [`Schema`]. Columns are always sized to the table's
//! capacity; slots at or beyond the table's size hold whatever the provider
//! filled them with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::component::Schema;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single component value.
///
/// Serialized untagged so snapshots read as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "string",
            Value::Json(_) => "json",
        }
    }

    /// The integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The numeric payload, widening integers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The text payload, if this is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Convert into a JSON value.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Integer(v) => serde_json::Value::from(v),
            // Non-finite floats have no JSON form and become null.
            Value::Number(v) => serde_json::Value::from(v),
            Value::Boolean(v) => serde_json::Value::Bool(v),
            Value::Text(v) => serde_json::Value::String(v),
            Value::Json(v) => v,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

/// Component values keyed by component name.
pub type Values = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// ColumnKind
// ---------------------------------------------------------------------------

/// Tag identifying which [`Column`] variant backs a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Number,
    Boolean,
    Text,
    Json,
}

impl ColumnKind {
    /// Pick a column kind from a schema's `"type"` keyword.
    pub fn for_schema(schema: &Schema) -> Self {
        match schema.type_keyword() {
            Some("integer") => ColumnKind::Integer,
            Some("number") => ColumnKind::Number,
            Some("boolean") => ColumnKind::Boolean,
            Some("string") => ColumnKind::Text,
            _ => ColumnKind::Json,
        }
    }

    /// Whether a value can be stored in a column of this kind.
    ///
    /// The match is exact, so whatever is written reads back as the same
    /// [`Value`] variant.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnKind::Integer, Value::Integer(_))
                | (ColumnKind::Number, Value::Number(_))
                | (ColumnKind::Boolean, Value::Boolean(_))
                | (ColumnKind::Text, Value::Text(_))
                | (ColumnKind::Json, Value::Json(_))
        )
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Number => "number",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Text => "string",
            ColumnKind::Json => "json",
        };
        f.write_str(name)
    }
}

/// A value was written into a column that cannot hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub expected: ColumnKind,
    pub found: &'static str,
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A dense, randomly indexable vector of values of one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Integer(Vec<i64>),
    Number(Vec<f64>),
    Boolean(Vec<bool>),
    Text(Vec<String>),
    Json(Vec<serde_json::Value>),
}

impl Column {
    /// A column of `kind` with `capacity` default-filled slots.
    pub fn with_kind(kind: ColumnKind, capacity: usize) -> Self {
        match kind {
            ColumnKind::Integer => Column::Integer(vec![0; capacity]),
            ColumnKind::Number => Column::Number(vec![0.0; capacity]),
            ColumnKind::Boolean => Column::Boolean(vec![false; capacity]),
            ColumnKind::Text => Column::Text(vec![String::new(); capacity]),
            ColumnKind::Json => Column::Json(vec![serde_json::Value::Null; capacity]),
        }
    }

    /// The variant tag.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Integer(_) => ColumnKind::Integer,
            Column::Number(_) => ColumnKind::Number,
            Column::Boolean(_) => ColumnKind::Boolean,
            Column::Text(_) => ColumnKind::Text,
            Column::Json(_) => ColumnKind::Json,
        }
    }

    /// Number of addressable slots.
    pub fn capacity(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Number(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Json(v) => v.len(),
        }
    }

    /// Resize to exactly `capacity` slots, keeping existing values below it.
    pub fn resize(&mut self, capacity: usize) {
        match self {
            Column::Integer(v) => v.resize(capacity, 0),
            Column::Number(v) => v.resize(capacity, 0.0),
            Column::Boolean(v) => v.resize(capacity, false),
            Column::Text(v) => v.resize(capacity, String::new()),
            Column::Json(v) => v.resize(capacity, serde_json::Value::Null),
        }
    }

    /// Copy out the value at `row`.
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Column::Integer(v) => v.get(row).map(|x| Value::Integer(*x)),
            Column::Number(v) => v.get(row).map(|x| Value::Number(*x)),
            Column::Boolean(v) => v.get(row).map(|x| Value::Boolean(*x)),
            Column::Text(v) => v.get(row).map(|x| Value::Text(x.clone())),
            Column::Json(v) => v.get(row).map(|x| Value::Json(x.clone())),
        }
    }

    /// Overwrite the value at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of the column's capacity.
    pub fn set(&mut self, row: usize, value: Value) -> Result<(), ShapeMismatch> {
        match (self, value) {
            (Column::Integer(v), Value::Integer(x)) => v[row] = x,
            (Column::Number(v), Value::Number(x)) => v[row] = x,
            (Column::Boolean(v), Value::Boolean(x)) => v[row] = x,
            (Column::Text(v), Value::Text(x)) => v[row] = x,
            (Column::Json(v), Value::Json(x)) => v[row] = x,
            (column, value) => {
                return Err(ShapeMismatch {
                    expected: column.kind(),
                    found: value.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Swap the values at two slots.
    pub fn swap(&mut self, a: usize, b: usize) {
        match self {
            Column::Integer(v) => v.swap(a, b),
            Column::Number(v) => v.swap(a, b),
            Column::Boolean(v) => v.swap(a, b),
            Column::Text(v) => v.swap(a, b),
            Column::Json(v) => v.swap(a, b),
        }
    }

    /// Copy out the first `len` values.
    pub fn slice(&self, len: usize) -> Vec<Value> {
        (0..len.min(self.capacity()))
            .filter_map(|row| self.get(row))
            .collect()
    }

    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            Column::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integers_mut(&mut self) -> Option<&mut [i64]> {
        match self {
            Column::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Column::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_numbers_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            Column::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_booleans(&self) -> Option<&[bool]> {
        match self {
            Column::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_booleans_mut(&mut self) -> Option<&mut [bool]> {
        match self {
            Column::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            Column::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texts_mut(&mut self) -> Option<&mut [String]> {
        match self {
            Column::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&[serde_json::Value]> {
        match self {
            Column::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_json_mut(&mut self) -> Option<&mut [serde_json::Value]> {
        match self {
            Column::Json(v) => Some(v),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageProvider
// ---------------------------------------------------------------------------

/// Creates and grows the column backing a component.
///
/// `resize` must keep every value below the old capacity. Contents of new
/// slots are up to the provider.
pub trait StorageProvider: fmt::Debug {
    /// Build a column for `schema` with `capacity` slots.
    fn create(&self, schema: &Schema, capacity: usize) -> Column;

    /// Grow `column` to `capacity` slots.
    fn resize(&self, schema: &Schema, column: &mut Column, capacity: usize);

    /// The kind of column [`create`](Self::create) builds for `schema`.
    fn kind(&self, schema: &Schema) -> ColumnKind {
        self.create(schema, 0).kind()
    }
}

/// Default provider: chooses the column variant from the schema's `"type"`
/// and fills new slots with the variant's zero value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaProvider;

impl StorageProvider for JsonSchemaProvider {
    fn create(&self, schema: &Schema, capacity: usize) -> Column {
        Column::with_kind(ColumnKind::for_schema(schema), capacity)
    }

    fn resize(&self, _schema: &Schema, column: &mut Column, capacity: usize) {
        column.resize(capacity);
    }

    fn kind(&self, schema: &Schema) -> ColumnKind {
        ColumnKind::for_schema(schema)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
