//! Error types for the rankboard core library.
//!
//! Uses `thiserror` for public API error types. Only two conditions abort a
//! normalization pass: an empty batch and a broken extension-rule configuration.
//! Incomplete source data (missing size, unknown quantization scheme, text in a
//! metric column) is tolerated and never surfaces here.

/// Top-level error type for building a normalized leaderboard.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("No data: the leaderboard batch is empty")]
    NoData,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from dataset metadata and extension-rule configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown extra column type '{kind}'")]
    UnknownRuleKind { kind: String },

    #[error("Malformed extra column #{index}: {message}")]
    MalformedRule { index: usize, message: String },

    #[error("Malformed metadata: {message}")]
    MalformedMetadata { message: String },

    #[error("Weight rule '{name}' has a total weight of zero")]
    ZeroWeight { name: String },

    #[error("Weight rule '{name}' has a non-finite weight for column '{column}'")]
    InvalidWeight { name: String, column: String },

    #[error("Name template '{template}' does not contain the placeholder '{placeholder}'")]
    MissingPlaceholder {
        template: String,
        placeholder: String,
    },

    #[error("Formula for column '{name}' is invalid: {source}")]
    Formula {
        name: String,
        #[source]
        source: ExprError,
    },
}

/// Errors from tokenizing or parsing a formula expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Invalid number literal: {literal}")]
    InvalidNumber { literal: String },

    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Unexpected token: {found}")]
    UnexpectedToken { found: String },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
}

impl ConfigError {
    pub fn malformed_rule(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedRule {
            index,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps_into_board_error() {
        let err: BoardError = ConfigError::ZeroWeight {
            name: "score".into(),
        }
        .into();
        assert!(matches!(err, BoardError::Config(ConfigError::ZeroWeight { .. })));
        assert_eq!(
            err.to_string(),
            "Configuration error: Weight rule 'score' has a total weight of zero"
        );
    }

    #[test]
    fn test_formula_error_keeps_source() {
        let err = ConfigError::Formula {
            name: "double".into(),
            source: ExprError::UnexpectedEnd,
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Unexpected end of expression"));
    }
}
