//! Cell values and records.
//!
//! Source records arrive as loosely typed JSON objects. They are converted into
//! [`Record`]s of tagged [`Cell`]s so every derivation step has to branch on
//! the tag before doing arithmetic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw leaderboard row as decoded from JSON, key order preserved.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A single field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Convert a JSON value. Booleans and nested values are kept as text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Number(n) => n.as_f64().map_or(Cell::Null, Cell::Number),
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            serde_json::Value::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Cell::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// The value seen by formulas: `null` reads as zero.
    pub fn zeroed(&self) -> Cell {
        match self {
            Cell::Null => Cell::Number(0.0),
            other => other.clone(),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// One leaderboard row: column name to cell.
///
/// Column order is owned by the catalog, not by the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    cells: HashMap<String, Cell>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Copy a raw row, dropping keys that start with `internal_prefix`.
    pub fn from_raw(raw: &RawRecord, internal_prefix: &str) -> Self {
        let cells = raw
            .iter()
            .filter(|(k, _)| !is_internal(k, internal_prefix))
            .map(|(k, v)| (k.clone(), Cell::from_json(v)))
            .collect();
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    /// Numeric value of a column, if present and numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(Cell::as_number)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Insert `null` unless the column already holds a value.
    pub fn fill_null(&mut self, column: &str) {
        if !self.cells.contains_key(column) {
            self.cells.insert(column.to_string(), Cell::Null);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Cell)> {
        self.cells.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.values_mut()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// A copy with every `null` replaced by zero, used as the formula view.
    pub fn zeroed(&self) -> Record {
        let cells = self
            .cells
            .iter()
            .map(|(k, v)| (k.clone(), v.zeroed()))
            .collect();
        Record { cells }
    }
}

impl<K: Into<String>, V: Into<Cell>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let cells = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { cells }
    }
}

pub(crate) fn is_internal(column: &str, internal_prefix: &str) -> bool {
    !internal_prefix.is_empty() && column.starts_with(internal_prefix)
}
