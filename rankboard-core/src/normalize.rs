//! Record normalizer: column discovery and missing-value filling.

use crate::catalog::ColumnCatalog;
use crate::cell::{RawRecord, Record, is_internal};
use crate::config::BoardConfig;
use crate::error::BoardError;

/// A dense batch: every record holds every catalog column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub catalog: ColumnCatalog,
    pub records: Vec<Record>,
}

impl NormalizedBatch {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column_count(&self) -> usize {
        self.catalog.len()
    }

    /// Make every record hold every catalog column, filling gaps with `null`.
    pub fn densify(&mut self) {
        fill_missing(&mut self.records, &self.catalog);
    }
}

/// Union of all non-internal keys across the batch, in first-seen order.
pub fn collect_columns(raw: &[RawRecord], internal_prefix: &str) -> ColumnCatalog {
    let mut catalog = ColumnCatalog::new();
    for record in raw {
        for key in record.keys() {
            if !is_internal(key, internal_prefix) {
                catalog.push(key);
            }
        }
    }
    catalog
}

/// Insert `null` for every catalog column a record lacks.
pub fn fill_missing(records: &mut [Record], catalog: &ColumnCatalog) {
    for record in records.iter_mut() {
        for column in catalog.iter() {
            record.fill_null(column);
        }
    }
}

/// Build a dense, uniform-shape copy of a raw batch.
///
/// The raw rows are only read; the returned batch owns its records.
pub fn normalize(raw: &[RawRecord], board: &BoardConfig) -> Result<NormalizedBatch, BoardError> {
    if raw.is_empty() {
        return Err(BoardError::NoData);
    }

    let catalog = collect_columns(raw, &board.internal_prefix);
    let records: Vec<Record> = raw
        .iter()
        .map(|r| Record::from_raw(r, &board.internal_prefix))
        .collect();
    let empty_rows = records.iter().filter(|r| r.is_empty()).count();

    let mut batch = NormalizedBatch { catalog, records };
    batch.densify();

    tracing::debug!(
        rows = batch.row_count(),
        columns = batch.column_count(),
        empty_rows,
        "Normalized raw leaderboard batch"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use serde_json::json;

    fn raw(values: serde_json::Value) -> Vec<RawRecord> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_catalog_is_union_in_first_seen_order() {
        let rows = raw(json!([
            {"model": "a", "size": 7, "mmlu": 60},
            {"model": "b", "gsm8k": 40, "size": 13},
            {"arc": 50, "model": "c"}
        ]));
        let batch = normalize(&rows, &BoardConfig::default()).unwrap();
        assert_eq!(
            batch.catalog.as_slice(),
            ["model", "size", "mmlu", "gsm8k", "arc"]
        );
    }

    #[test]
    fn test_missing_fields_filled_with_null() {
        let rows = raw(json!([
            {"model": "a", "mmlu": 60},
            {"model": "b", "gsm8k": 40}
        ]));
        let batch = normalize(&rows, &BoardConfig::default()).unwrap();
        for record in &batch.records {
            assert_eq!(record.len(), 3);
        }
        assert_eq!(batch.records[0].get("gsm8k"), Some(&Cell::Null));
        assert_eq!(batch.records[1].get("mmlu"), Some(&Cell::Null));
        assert_eq!(batch.records[1].number("gsm8k"), Some(40.0));
    }

    #[test]
    fn test_internal_keys_excluded() {
        let rows = raw(json!([
            {"model": "a", "__meta__": {"hidden_columns": []}, "_source": "hf"}
        ]));
        let batch = normalize(&rows, &BoardConfig::default()).unwrap();
        assert_eq!(batch.catalog.as_slice(), ["model"]);
        assert!(!batch.records[0].contains("__meta__"));
    }

    #[test]
    fn test_empty_batch_is_no_data() {
        let err = normalize(&[], &BoardConfig::default()).unwrap_err();
        assert!(matches!(err, BoardError::NoData));
    }

    #[test]
    fn test_raw_input_is_not_mutated() {
        let rows = raw(json!([{"model": "a"}, {"model": "b", "x": 1}]));
        let before = rows.clone();
        let _ = normalize(&rows, &BoardConfig::default()).unwrap();
        assert_eq!(rows, before);
    }
}
