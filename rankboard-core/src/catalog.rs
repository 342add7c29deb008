//! Column catalog: the ordered set of column names shared by every record.

use serde::{Serialize, Serializer};
use std::collections::HashSet;

/// Insertion-ordered set of column names.
///
/// Order is first-seen order across the whole batch and is meaningful for
/// display, so columns are never sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    columns: Vec<String>,
    seen: HashSet<String>,
}

impl ColumnCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column if it is not already present. Returns `true` when added.
    pub fn push(&mut self, column: &str) -> bool {
        if self.seen.contains(column) {
            return false;
        }
        self.seen.insert(column.to_string());
        self.columns.push(column.to_string());
        true
    }

    /// Insert a column at `index` (clamped to the end) if not already present.
    pub fn insert_at(&mut self, index: usize, column: &str) -> bool {
        if self.seen.contains(column) {
            return false;
        }
        self.seen.insert(column.to_string());
        self.columns
            .insert(index.min(self.columns.len()), column.to_string());
        true
    }

    pub fn contains(&self, column: &str) -> bool {
        self.seen.contains(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for ColumnCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.columns)
    }
}

impl<'a> FromIterator<&'a str> for ColumnCatalog {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut catalog = ColumnCatalog::new();
        for column in iter {
            catalog.push(column);
        }
        catalog
    }
}
