//! Named dataset registry with memoized normalized boards.

use crate::board::{Leaderboard, NormalizedBoard};
use crate::cell::RawRecord;
use crate::error::BoardError;
use std::collections::HashMap;

/// A named raw leaderboard batch.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    pub name: String,
    pub records: Vec<RawRecord>,
}

/// Registry of leaderboard datasets, in insertion order.
///
/// Boards are normalized on first request and cached by dataset name; the
/// cache is an optimization only and is dropped whenever a dataset changes.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    builder: Leaderboard,
    datasets: Vec<DatasetEntry>,
    cache: HashMap<String, NormalizedBoard>,
}

impl DatasetRegistry {
    pub fn new(builder: Leaderboard) -> Self {
        Self {
            builder,
            datasets: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Add a dataset, replacing any dataset with the same name.
    pub fn insert(&mut self, name: impl Into<String>, records: Vec<RawRecord>) {
        let name = name.into();
        self.cache.remove(&name);
        match self.datasets.iter_mut().find(|d| d.name == name) {
            Some(entry) => entry.records = records,
            None => self.datasets.push(DatasetEntry { name, records }),
        }
    }

    pub fn find(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Dataset names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn list(&self) -> &[DatasetEntry] {
        &self.datasets
    }

    /// Remove a dataset by name.
    pub fn remove(&mut self, name: &str) -> bool {
        self.cache.remove(name);
        let len = self.datasets.len();
        self.datasets.retain(|d| d.name != name);
        self.datasets.len() < len
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Normalized board for `name`, or `None` if no such dataset exists.
    pub fn board(&mut self, name: &str) -> Option<Result<&NormalizedBoard, BoardError>> {
        if !self.cache.contains_key(name) {
            let entry = self.datasets.iter().find(|d| d.name == name)?;
            tracing::debug!(dataset = name, "Normalizing dataset");
            match self.builder.build(&entry.records) {
                Ok(board) => {
                    self.cache.insert(name.to_string(), board);
                }
                Err(e) => return Some(Err(e)),
            }
        }
        self.cache.get(name).map(Ok)
    }
}
