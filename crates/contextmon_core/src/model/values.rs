//! Untyped column/value map for insert and update commands.

use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Owned SQLite value accepted by [`FieldValues`] and filter arguments.
///
/// Covers string slices, which `rusqlite::types::Value` has no conversion for.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue(pub Value);

impl ColumnValue {
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ColumnValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self(Value::Text(value.to_string()))
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self(Value::Text(value))
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self(Value::Integer(value))
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<u32> for ColumnValue {
    fn from(value: u32) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self(Value::Integer(i64::from(value)))
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self(Value::Real(value))
    }
}

impl From<Vec<u8>> for ColumnValue {
    fn from(value: Vec<u8>) -> Self {
        Self(Value::Blob(value))
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self(Value::Null),
        }
    }
}

/// Column name to value map, ordered by column name for stable SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: BTreeMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A later value for the same column wins.
    pub fn put(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values
            .insert(column.into(), value.into().into_value());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }
}
