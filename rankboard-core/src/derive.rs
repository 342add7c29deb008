//! Derived-metric engine.
//!
//! Adds a per-billion-parameter sibling (`pb-<col>`) and a de-quantized
//! sibling (`uq-<col>`) for every numeric metric column.

use crate::catalog::ColumnCatalog;
use crate::cell::Cell;
use crate::config::BoardConfig;
use crate::normalize::NormalizedBatch;
use crate::quant;

pub const MODEL: &str = "model";
pub const SIZE: &str = "size";
pub const QUANTIZATION: &str = "quantization";
pub const AVERAGE: &str = "average";

/// Identity columns every leaderboard row is expected to carry.
pub const PRIVILEGED: [&str; 3] = [MODEL, SIZE, QUANTIZATION];

/// A metric column is anything that is neither privileged nor derived.
pub fn is_metric(column: &str, board: &BoardConfig) -> bool {
    !PRIVILEGED.contains(&column) && !board.is_derived(column)
}

fn metric_columns(catalog: &ColumnCatalog, board: &BoardConfig) -> Vec<String> {
    catalog
        .iter()
        .filter(|c| is_metric(c, board))
        .map(str::to_string)
        .collect()
}

/// Score per billion parameters. Sizes of zero or below score zero.
pub fn per_size(value: f64, size: f64) -> f64 {
    if size <= 0.0 { 0.0 } else { value / size }
}

/// Register `<prefix><source>` for every source that produced a value.
fn register(catalog: &mut ColumnCatalog, prefix: &str, sources: &[String], hit: &[bool]) -> usize {
    let mut added = 0;
    for (source, _) in sources.iter().zip(hit).filter(|(_, hit)| **hit) {
        if catalog.push(&format!("{prefix}{source}")) {
            added += 1;
        }
    }
    added
}

/// Add `pb-<col> = value / size` to every record with a numeric size.
///
/// Skipped entirely when `size` is not a catalog column. Returns the number of
/// columns registered.
pub fn add_per_size_scores(batch: &mut NormalizedBatch, board: &BoardConfig) -> usize {
    if !batch.catalog.contains(SIZE) {
        return 0;
    }
    let sources = metric_columns(&batch.catalog, board);
    let mut hit = vec![false; sources.len()];

    for (row, record) in batch.records.iter_mut().enumerate() {
        let Some(size) = record.number(SIZE) else {
            tracing::debug!(row, "No numeric size, skipping per-size scores");
            continue;
        };
        for (i, source) in sources.iter().enumerate() {
            if let Some(value) = record.number(source) {
                record.insert(
                    format!("{}{source}", board.per_size_prefix),
                    per_size(value, size),
                );
                hit[i] = true;
            }
        }
    }

    register(&mut batch.catalog, &board.per_size_prefix, &sources, &hit)
}

/// Add `uq-<col> = unquant(value, quantization)` to every quantized record.
///
/// Skipped entirely when `quantization` is not a catalog column. Returns the
/// number of columns registered.
pub fn add_dequant_scores(batch: &mut NormalizedBatch, board: &BoardConfig) -> usize {
    if !batch.catalog.contains(QUANTIZATION) {
        return 0;
    }
    let sources = metric_columns(&batch.catalog, board);
    let mut hit = vec![false; sources.len()];

    for record in batch.records.iter_mut() {
        let Some(scheme) = record
            .get(QUANTIZATION)
            .and_then(Cell::as_text)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        if quant::lookup(&scheme) == quant::RatioLookup::Unknown {
            tracing::debug!(scheme = %scheme, "Unknown quantization scheme, scores kept as-is");
        }
        for (i, source) in sources.iter().enumerate() {
            if let Some(value) = record.number(source) {
                record.insert(
                    format!("{}{source}", board.dequant_prefix),
                    quant::unquant(value, &scheme),
                );
                hit[i] = true;
            }
        }
    }

    register(&mut batch.catalog, &board.dequant_prefix, &sources, &hit)
}

/// Fill a missing `average` with the mean of each record's numeric metrics.
pub fn synthesize_average(batch: &mut NormalizedBatch, board: &BoardConfig) {
    let sources: Vec<String> = metric_columns(&batch.catalog, board)
        .into_iter()
        .filter(|c| c != AVERAGE)
        .collect();

    for record in batch.records.iter_mut() {
        if record.number(AVERAGE).is_some() {
            continue;
        }
        let values: Vec<f64> = sources.iter().filter_map(|c| record.number(c)).collect();
        let average = if values.is_empty() {
            Cell::Null
        } else {
            Cell::Number(values.iter().sum::<f64>() / values.len() as f64)
        };
        record.insert(AVERAGE, average);
    }

    let after_identity = batch
        .catalog
        .iter()
        .take_while(|c| PRIVILEGED.contains(c))
        .count();
    batch.catalog.insert_at(after_identity, AVERAGE);
}
