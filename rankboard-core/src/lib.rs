//! # rankboard-core: leaderboard record normalization
//!
//! Prepares heterogeneous model-benchmark records for tabular display:
//!
//! 1. **Normalizer**: discovers the union of columns in first-seen order and
//!    fills missing fields with `null`.
//! 2. **Derived metrics**: adds per-billion-parameter (`pb-`) and
//!    de-quantized (`uq-`) siblings for every numeric metric.
//! 3. **Extra columns**: applies the dataset's `formula`, `formula-map` and
//!    `weight` rules from its metadata.
//! 4. **Finalization**: rounds every number to two decimals.
//!
//! Everything runs synchronously over an in-memory batch; reading and
//! rendering leaderboard files is left to the caller.

pub mod board;
pub mod catalog;
pub mod cell;
pub mod config;
pub mod derive;
pub mod error;
pub mod expr;
pub mod extension;
pub mod finalize;
pub mod metadata;
pub mod normalize;
pub mod quant;
pub mod registry;

// Re-exports
pub use board::{ColumnRange, Leaderboard, NormalizedBoard};
pub use catalog::ColumnCatalog;
pub use cell::{Cell, RawRecord, Record};
pub use config::{BoardConfig, RankboardConfig, load_config};
pub use error::{BoardError, ConfigError, ExprError};
pub use metadata::{ExtraColumn, Metadata};
pub use normalize::{NormalizedBatch, normalize};
pub use quant::{RatioLookup, retention_ratio, unquant};
pub use registry::DatasetRegistry;

/// Normalize `raw` with default settings.
pub fn build_board(raw: &[RawRecord]) -> Result<NormalizedBoard, BoardError> {
    Leaderboard::default().build(raw)
}
