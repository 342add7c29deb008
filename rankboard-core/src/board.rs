//! Pipeline entry point and the normalized board handed to the presentation layer.
//!
//! raw batch -> normalizer -> per-size / de-quantized scores -> extra columns
//! -> rounding.

use crate::catalog::ColumnCatalog;
use crate::cell::{Cell, RawRecord, Record};
use crate::config::BoardConfig;
use crate::derive::{self, QUANTIZATION};
use crate::error::BoardError;
use crate::extension::apply_extra_columns;
use crate::finalize::finalize;
use crate::metadata::Metadata;
use crate::normalize::normalize;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Builds normalized boards from raw leaderboard batches.
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    board: BoardConfig,
}

impl Leaderboard {
    pub fn new(board: BoardConfig) -> Self {
        Self { board }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.board
    }

    /// Run the full normalization pipeline over `raw`.
    ///
    /// Fails with [`BoardError::NoData`] on an empty batch and with
    /// [`BoardError::Config`] on broken metadata. The raw rows are not modified.
    pub fn build(&self, raw: &[RawRecord]) -> Result<NormalizedBoard, BoardError> {
        if raw.is_empty() {
            return Err(BoardError::NoData);
        }
        let metadata = Metadata::from_batch(raw, &self.board.meta_key)?.unwrap_or_default();

        let mut batch = normalize(raw, &self.board)?;
        if self.board.synthesize_average {
            derive::synthesize_average(&mut batch, &self.board);
        }
        let per_size = derive::add_per_size_scores(&mut batch, &self.board);
        let dequant = derive::add_dequant_scores(&mut batch, &self.board);
        apply_extra_columns(&mut batch, &metadata.extra_columns, &self.board)?;
        finalize(&mut batch);

        let has_quantization = raw.iter().any(|r| has_value(r.get(QUANTIZATION)));
        let hidden: HashSet<&str> = metadata.hidden_columns.iter().map(String::as_str).collect();
        let visibility = batch
            .catalog
            .iter()
            .map(|column| {
                let is_hidden = self.board.is_derived(column)
                    || hidden.contains(column)
                    || (column == QUANTIZATION && !has_quantization);
                (column.to_string(), !is_hidden)
            })
            .collect();

        tracing::info!(
            rows = batch.records.len(),
            columns = batch.catalog.len(),
            per_size_columns = per_size,
            dequant_columns = dequant,
            extra_rules = metadata.extra_columns.len(),
            "Built normalized leaderboard"
        );

        Ok(NormalizedBoard {
            catalog: batch.catalog,
            visibility,
            data: batch.records,
        })
    }
}

/// Whether a raw field carries a usable value (not absent, null, empty or false).
fn has_value(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Min and max of the finite numeric values in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// Fully dense, display-ready leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBoard {
    catalog: ColumnCatalog,
    visibility: HashMap<String, bool>,
    data: Vec<Record>,
}

impl NormalizedBoard {
    pub fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &[Record] {
        &self.data
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Default visibility of a catalog column; unknown columns are not visible.
    pub fn is_visible(&self, column: &str) -> bool {
        self.visibility.get(column).copied().unwrap_or(false)
    }

    /// `(column, visible)` pairs in catalog order.
    pub fn visibility_defaults(&self) -> Vec<(&str, bool)> {
        self.catalog
            .iter()
            .map(|c| (c, self.is_visible(c)))
            .collect()
    }

    /// Columns hidden by default, in catalog order.
    pub fn hidden_columns(&self) -> Vec<&str> {
        self.catalog.iter().filter(|c| !self.is_visible(c)).collect()
    }

    /// Value range of every column holding at least one finite number.
    pub fn column_ranges(&self) -> Vec<ColumnRange> {
        self.catalog
            .iter()
            .filter_map(|column| {
                let values = self
                    .data
                    .iter()
                    .filter_map(|r| r.number(column))
                    .filter(|n| n.is_finite());
                let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, n| match acc {
                    None => Some((n, n)),
                    Some((lo, hi)) => Some((lo.min(n), hi.max(n))),
                })?;
                Some(ColumnRange {
                    column: column.to_string(),
                    min,
                    max,
                })
            })
            .collect()
    }

    /// Catalog-ordered JSON rendering of the board.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Serializes a record with keys in catalog order.
struct OrderedRecord<'a> {
    catalog: &'a ColumnCatalog,
    record: &'a Record,
}

impl Serialize for OrderedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.catalog.len()))?;
        for column in self.catalog.iter() {
            let cell = self.record.get(column).unwrap_or(&Cell::Null);
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

struct OrderedVisibility<'a>(&'a NormalizedBoard);

impl Serialize for OrderedVisibility<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let defaults = self.0.visibility_defaults();
        let mut map = serializer.serialize_map(Some(defaults.len()))?;
        for (column, visible) in defaults {
            map.serialize_entry(column, &visible)?;
        }
        map.end()
    }
}

struct OrderedRows<'a>(&'a NormalizedBoard);

impl Serialize for OrderedRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.data.iter().map(|record| OrderedRecord {
            catalog: &self.0.catalog,
            record,
        }))
    }
}

impl Serialize for NormalizedBoard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("catalog", &self.catalog)?;
        map.serialize_entry("visibility_defaults", &OrderedVisibility(self))?;
        map.serialize_entry("data", &OrderedRows(self))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(values: serde_json::Value) -> Vec<RawRecord> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_build_full_pipeline() {
        let rows = raw(json!([
            {"model": "a", "size": 10, "quantization": "Q4_K_M", "x": 50},
            {"model": "b", "size": 0, "quantization": "F16", "x": 20}
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();

        assert_eq!(
            board.catalog().as_slice(),
            ["model", "size", "quantization", "x", "pb-x", "uq-x"]
        );
        let a = &board.records()[0];
        assert_eq!(a.number("pb-x"), Some(5.0));
        assert_eq!(a.number("uq-x"), Some(60.98));
        let b = &board.records()[1];
        assert_eq!(b.number("pb-x"), Some(0.0));
        assert_eq!(b.number("uq-x"), Some(20.0));
    }

    #[test]
    fn test_visibility_defaults() {
        let rows = raw(json!([
            {
                "model": "a", "size": 7, "quantization": null, "x": 1, "notes": "n",
                "__meta__": {"hidden_columns": ["notes"]}
            }
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();
        assert_eq!(
            board.visibility_defaults(),
            vec![
                ("model", true),
                ("size", true),
                ("quantization", false),
                ("x", true),
                ("notes", false),
                ("pb-x", false),
            ]
        );
        assert_eq!(board.hidden_columns(), vec!["quantization", "notes", "pb-x"]);
    }

    #[test]
    fn test_quantization_visible_when_any_record_has_it() {
        let rows = raw(json!([
            {"model": "a", "quantization": null, "x": 1},
            {"model": "b", "quantization": "Q8_0", "x": 2}
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();
        assert!(board.is_visible("quantization"));
        assert!(!board.is_visible("uq-x"));
    }

    #[test]
    fn test_extension_columns_follow_derivation() {
        let rows = raw(json!([
            {
                "model": "a", "size": 2, "x": 10, "y": null,
                "__meta__": {
                    "extra_columns": [
                        {"type": "weight", "name": "mix", "weights": {"x": 3, "y": 1}}
                    ]
                }
            }
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();
        assert_eq!(
            board.catalog().as_slice(),
            ["model", "size", "x", "y", "pb-x", "mix"]
        );
        assert_eq!(board.records()[0].number("mix"), Some(7.5));
        assert!(!board.catalog().contains("pb-mix"));
        assert!(board.is_visible("mix"));
    }

    #[test]
    fn test_config_errors_surface() {
        let rows = raw(json!([
            {"model": "a", "__meta__": {"extra_columns": [{"type": "lua", "name": "x"}]}}
        ]));
        let err = Leaderboard::default().build(&rows).unwrap_err();
        assert!(matches!(
            err,
            BoardError::Config(ConfigError::UnknownRuleKind { .. })
        ));
    }

    #[test]
    fn test_empty_batch() {
        let err = Leaderboard::default().build(&[]).unwrap_err();
        assert!(matches!(err, BoardError::NoData));
    }

    #[test]
    fn test_column_ranges() {
        let rows = raw(json!([
            {"model": "a", "x": 3, "y": "text"},
            {"model": "b", "x": -1, "y": null},
            {"model": "c", "x": 7}
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();
        assert_eq!(
            board.column_ranges(),
            vec![ColumnRange {
                column: "x".into(),
                min: -1.0,
                max: 7.0
            }]
        );
    }

    #[test]
    fn test_json_output_is_catalog_ordered() {
        let rows = raw(json!([
            {"model": "a", "size": 3, "x": 1},
            {"x": 2, "model": "b"}
        ]));
        let board = Leaderboard::default().build(&rows).unwrap();
        let text = serde_json::to_string(&board).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"catalog":["model","size","x","pb-x"],"#,
                r#""visibility_defaults":{"model":true,"size":true,"x":true,"pb-x":false},"#,
                r#""data":[{"model":"a","size":3.0,"x":1.0,"pb-x":0.33},"#,
                r#"{"model":"b","size":null,"x":2.0,"pb-x":null}]}"#
            )
        );
    }
}
