//! Row-level value types.
//!
//! An observation table is a set of equal-length columns. One row of that
//! table, read back from the bundle, becomes a [`RowRecord`]: the column
//! names in table order, each paired with a small tagged [`CellValue`].

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A single scalar cell read from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value (absent cell, null code, or unrepresentable element).
    Null,
    /// Boolean column element.
    Bool(bool),
    /// Integer column element.
    Int(i64),
    /// Floating point column element.
    Float(f64),
    /// UTF-8 string column element.
    Text(String),
}

impl CellValue {
    /// Coerce this cell to a finite number.
    ///
    /// Numbers pass through; strings are parsed as decimal floats after
    /// trimming. Booleans and nulls never coerce.
    pub fn as_finite_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Int(v) => *v as f64,
            CellValue::Float(v) => *v,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Bool(_) | CellValue::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Borrow the string content if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Bool(v) => serializer.serialize_bool(*v),
            CellValue::Int(v) => serializer.serialize_i64(*v),
            // JSON has no NaN/Infinity
            CellValue::Float(v) if !v.is_finite() => serializer.serialize_none(),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// One table row: column name to cell value, in table column order.
///
/// Serializes as a JSON object whose keys keep the column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowRecord {
    entries: Vec<(String, CellValue)>,
}

impl RowRecord {
    /// Create an empty record with room for `columns` cells.
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            entries: Vec::with_capacity(columns),
        }
    }

    /// Append a cell. Column order is insertion order.
    pub fn push(&mut self, column: impl Into<String>, value: CellValue) {
        self.entries.push((column.into(), value));
    }

    /// Builder-style [`RowRecord::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
