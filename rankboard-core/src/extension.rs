//! Metadata-driven extension layer.
//!
//! Applies a dataset's `extra_columns` rules in list order. Every rule is
//! compiled before any record is touched, and each rule's column is added to
//! every record and to the catalog before the next rule runs, so later rules
//! may read columns produced by earlier ones.

use crate::catalog::ColumnCatalog;
use crate::cell::{Cell, is_internal};
use crate::config::BoardConfig;
use crate::error::ConfigError;
use crate::expr::Formula;
use crate::metadata::ExtraColumn;
use crate::normalize::NormalizedBatch;

/// An extra-column rule validated and ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledRule {
    Formula {
        name: String,
        formula: Formula,
    },
    FormulaMap {
        template: String,
        /// `(source column, output column)` pairs.
        targets: Vec<(String, String)>,
    },
    Weight {
        name: String,
        weights: Vec<(String, f64)>,
        total: f64,
    },
}

impl CompiledRule {
    pub fn compile(rule: &ExtraColumn, board: &BoardConfig) -> Result<Self, ConfigError> {
        match rule {
            ExtraColumn::Formula { name, formula } => {
                let formula = Formula::parse(formula).map_err(|source| ConfigError::Formula {
                    name: name.clone(),
                    source,
                })?;
                Ok(CompiledRule::Formula {
                    name: name.clone(),
                    formula,
                })
            }
            ExtraColumn::FormulaMap { column, name } => {
                let placeholder = &board.column_placeholder;
                if !name.contains(placeholder.as_str()) {
                    return Err(ConfigError::MissingPlaceholder {
                        template: name.clone(),
                        placeholder: placeholder.clone(),
                    });
                }
                let targets = column
                    .iter()
                    .map(|c| (c.clone(), name.replace(placeholder.as_str(), c)))
                    .collect();
                Ok(CompiledRule::FormulaMap {
                    template: name.clone(),
                    targets,
                })
            }
            ExtraColumn::Weight { name, weights } => {
                if let Some((column, _)) = weights.iter().find(|(_, w)| !w.is_finite()) {
                    return Err(ConfigError::InvalidWeight {
                        name: name.clone(),
                        column: column.clone(),
                    });
                }
                let total: f64 = weights.values().sum();
                if total == 0.0 {
                    return Err(ConfigError::ZeroWeight { name: name.clone() });
                }
                Ok(CompiledRule::Weight {
                    name: name.clone(),
                    weights: weights.iter().map(|(c, w)| (c.clone(), *w)).collect(),
                    total,
                })
            }
        }
    }

    /// Columns this rule writes.
    pub fn outputs(&self) -> Vec<&str> {
        match self {
            CompiledRule::Formula { name, .. } | CompiledRule::Weight { name, .. } => {
                vec![name.as_str()]
            }
            CompiledRule::FormulaMap { targets, .. } => {
                targets.iter().map(|(_, t)| t.as_str()).collect()
            }
        }
    }

    /// Columns this rule reads that the catalog does not hold.
    ///
    /// Missing reads are not an error: they see `null` and the rule still runs.
    fn missing_reads<'a>(&'a self, catalog: &ColumnCatalog) -> Vec<&'a str> {
        let reads: Vec<&str> = match self {
            CompiledRule::Formula { formula, .. } => formula.fields(),
            CompiledRule::FormulaMap { targets, .. } => {
                targets.iter().map(|(s, _)| s.as_str()).collect()
            }
            CompiledRule::Weight { weights, .. } => {
                weights.iter().map(|(c, _)| c.as_str()).collect()
            }
        };
        reads.into_iter().filter(|c| !catalog.contains(c)).collect()
    }

    /// Drop outputs named with the internal prefix; they never become columns.
    ///
    /// Returns `None` when nothing is left to write.
    fn without_internal_outputs(self, internal_prefix: &str) -> Option<Self> {
        match self {
            CompiledRule::Formula { ref name, .. } | CompiledRule::Weight { ref name, .. }
                if is_internal(name, internal_prefix) =>
            {
                tracing::debug!(column = %name, "Skipping extra column with internal name");
                None
            }
            CompiledRule::FormulaMap { template, targets } => {
                let targets: Vec<(String, String)> = targets
                    .into_iter()
                    .filter(|(_, target)| {
                        let internal = is_internal(target, internal_prefix);
                        if internal {
                            tracing::debug!(
                                column = %target,
                                "Skipping extra column with internal name"
                            );
                        }
                        !internal
                    })
                    .collect();
                if targets.is_empty() {
                    None
                } else {
                    Some(CompiledRule::FormulaMap { template, targets })
                }
            }
            rule => Some(rule),
        }
    }

    /// Add this rule's columns to every record and to the catalog.
    pub fn apply(&self, batch: &mut NormalizedBatch) {
        let missing = self.missing_reads(&batch.catalog);
        if !missing.is_empty() {
            tracing::debug!(
                outputs = ?self.outputs(),
                missing = ?missing,
                "Extra column rule reads columns absent from the batch"
            );
        }

        for record in batch.records.iter_mut() {
            let view = record.zeroed();
            match self {
                CompiledRule::Formula { name, formula } => {
                    let value = match formula.eval(&view) {
                        Cell::Number(n) if !n.is_finite() => {
                            tracing::warn!(
                                column = %name,
                                formula = formula.source(),
                                "Formula produced a non-finite value, storing null"
                            );
                            Cell::Null
                        }
                        other => other,
                    };
                    record.insert(name.clone(), value);
                }
                CompiledRule::FormulaMap { targets, .. } => {
                    for (source, target) in targets {
                        let value = view.get(source).cloned().unwrap_or_default();
                        record.insert(target.clone(), value);
                    }
                }
                CompiledRule::Weight {
                    name,
                    weights,
                    total,
                } => {
                    let sum: f64 = weights
                        .iter()
                        .map(|(c, w)| view.number(c).unwrap_or(0.0) * w)
                        .sum();
                    record.insert(name.clone(), sum / total);
                }
            }
        }

        for column in self.outputs() {
            batch.catalog.push(column);
        }
    }
}

/// Compile every rule, then apply them in order.
pub fn apply_extra_columns(
    batch: &mut NormalizedBatch,
    rules: &[ExtraColumn],
    board: &BoardConfig,
) -> Result<(), ConfigError> {
    let compiled = rules
        .iter()
        .map(|r| CompiledRule::compile(r, board))
        .collect::<Result<Vec<_>, _>>()?;

    for rule in compiled
        .into_iter()
        .filter_map(|r| r.without_internal_outputs(&board.internal_prefix))
    {
        rule.apply(batch);
        tracing::debug!(columns = ?rule.outputs(), "Applied extra column rule");
    }
    Ok(())
}
