//! Rounding and finalization for display.

use crate::cell::Cell;
use crate::config::DISPLAY_PRECISION;
use crate::normalize::NormalizedBatch;

/// Round half away from zero to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    // Avoid emitting -0.0 for tiny negatives.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Densify the batch and round every numeric cell to display precision.
///
/// Runs last so derived and extension columns are rounded too.
pub fn finalize(batch: &mut NormalizedBatch) {
    batch.densify();
    for record in batch.records.iter_mut() {
        for cell in record.values_mut() {
            if let Cell::Number(n) = cell {
                *n = round_to(*n, DISPLAY_PRECISION);
            }
        }
    }
}
