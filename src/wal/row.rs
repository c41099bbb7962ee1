//! Row images: the before/after snapshots attached to data records
//!
//! On disk an image is a JSON array of JSON objects, e.g.
//! `[{"id":1,"name":"old_value"}]`. Decoding goes through `serde_json` into
//! the typed model below; anything that is not exactly that shape (nested
//! arrays, objects as values, duplicate columns, trailing garbage) is
//! rejected. Nothing in a log line is ever evaluated.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Token written in place of an absent image or statement
pub const ABSENT: &str = "None";

/// Errors decoding a row-image literal
#[derive(Debug, Error)]
pub enum LiteralError {
    #[error("malformed row image literal: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Render as a SQL literal: text single-quoted with `'` doubled,
    /// numbers bare, booleans `TRUE`/`FALSE`, `NULL` for null.
    pub fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// True for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// False for NaN and infinite floats, which the literal cannot carry
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One row: column name to value, in column order.
///
/// Column order is kept because it determines the column order of
/// generated statements. Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: append a column. Replaces the value if the column
    /// already exists, keeping its position.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    /// (column, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|(c, v)| other.get(c).map_or(false, |o| o == v))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut columns: Vec<(String, Value)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((column, value)) = access.next_entry::<String, Value>()? {
                    if columns.iter().any(|(c, _)| *c == column) {
                        return Err(de::Error::custom(format!("duplicate column '{}'", column)));
                    }
                    columns.push((column, value));
                }
                Ok(Row { columns })
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Ordered rows captured before or after a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowImage {
    rows: Vec<Row>,
}

impl RowImage {
    /// Image holding `rows`
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Image with no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows in capture order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row count; always `rows().len()`
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// True if no rows were captured
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column holding a NaN or infinite float, if any
    pub fn non_finite_column(&self) -> Option<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .find(|(_, value)| !value.is_finite())
            .map(|(column, _)| column)
    }

    /// Encode as the on-disk literal.
    ///
    /// NaN and infinite floats come out as `null`; `WalStore::append`
    /// refuses such images.
    pub fn to_literal(&self) -> String {
        // Serializing plain strings, numbers and maps cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Decode the on-disk literal
    pub fn from_literal(literal: &str) -> Result<Self, LiteralError> {
        Ok(serde_json::from_str(literal.trim())?)
    }
}

/// Encode an optional image, `None` for absent
pub fn encode_image(image: Option<&RowImage>) -> String {
    match image {
        Some(image) => image.to_literal(),
        None => ABSENT.to_string(),
    }
}

/// Decode an optional image, accepting `None` for absent
pub fn decode_image(field: &str) -> Result<Option<RowImage>, LiteralError> {
    let field = field.trim();
    if field == ABSENT {
        return Ok(None);
    }
    RowImage::from_literal(field).map(Some)
}
