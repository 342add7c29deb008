//! Dataset metadata carried on the first record of a batch.

use crate::cell::RawRecord;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative rule adding derived columns to every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtraColumn {
    /// One column computed from an expression over the record.
    #[serde(rename = "formula")]
    Formula { name: String, formula: String },
    /// One column per source column, named from a template.
    #[serde(rename = "formula-map")]
    FormulaMap { column: Vec<String>, name: String },
    /// Weighted average of the listed columns.
    #[serde(rename = "weight")]
    Weight {
        name: String,
        weights: BTreeMap<String, f64>,
    },
}

impl ExtraColumn {
    pub const KINDS: [&'static str; 3] = ["formula", "formula-map", "weight"];

    pub fn kind(&self) -> &'static str {
        match self {
            ExtraColumn::Formula { .. } => "formula",
            ExtraColumn::FormulaMap { .. } => "formula-map",
            ExtraColumn::Weight { .. } => "weight",
        }
    }

    /// Output column name, or the name template for `formula-map`.
    pub fn name(&self) -> &str {
        match self {
            ExtraColumn::Formula { name, .. }
            | ExtraColumn::FormulaMap { name, .. }
            | ExtraColumn::Weight { name, .. } => name,
        }
    }

    /// Decode one `extra_columns` entry, rejecting unknown kinds explicitly.
    pub fn from_json(index: usize, value: &serde_json::Value) -> Result<Self, ConfigError> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfigError::malformed_rule(index, "missing string field 'type'"))?;
        if !Self::KINDS.contains(&kind) {
            return Err(ConfigError::UnknownRuleKind {
                kind: kind.to_string(),
            });
        }
        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::malformed_rule(index, e.to_string()))
    }
}

/// Per-dataset display metadata. Read once, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub hidden_columns: Vec<String>,
    #[serde(default)]
    pub extra_columns: Vec<ExtraColumn>,
}

impl Metadata {
    /// Decode a metadata object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ConfigError::MalformedMetadata {
                message: format!("expected an object, got {value}"),
            })?;

        let hidden_columns = match obj.get("hidden_columns") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
                ConfigError::MalformedMetadata {
                    message: format!("hidden_columns: {e}"),
                }
            })?,
        };

        let extra_columns = match obj.get("extra_columns") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| ExtraColumn::from_json(i, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ConfigError::MalformedMetadata {
                    message: "extra_columns must be a list".to_string(),
                });
            }
        };

        Ok(Self {
            hidden_columns,
            extra_columns,
        })
    }

    /// Read metadata from `meta_key` on the first record, if present.
    pub fn from_batch(raw: &[RawRecord], meta_key: &str) -> Result<Option<Self>, ConfigError> {
        match raw.first().and_then(|r| r.get(meta_key)) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Self::from_json(value).map(Some),
        }
    }
}
