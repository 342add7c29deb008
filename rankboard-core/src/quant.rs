//! Quantization retention model.
//!
//! Maps GGUF-style quantization scheme identifiers (`Q4_K_M`, `iq3_xs`, ...)
//! to the fraction of the full-precision benchmark score the scheme retains,
//! and inverts that fraction to estimate an un-quantized score.

use std::sync::LazyLock;

/// One named scheme within a quantization level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantVariant {
    pub name: &'static str,
    pub bits: f64,
    pub performance_ratio: f64,
}

/// A quantization level (`Q4`, `Q5`, ...) and its known variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantLevel {
    pub name: &'static str,
    pub variants: &'static [QuantVariant],
}

impl QuantLevel {
    /// Unweighted mean of the variants' performance ratios.
    pub fn mean_ratio(&self) -> f64 {
        let sum: f64 = self.variants.iter().map(|v| v.performance_ratio).sum();
        sum / self.variants.len() as f64
    }
}

const fn variant(name: &'static str, bits: f64, performance_ratio: f64) -> QuantVariant {
    QuantVariant {
        name,
        bits,
        performance_ratio,
    }
}

static QUANT_LEVELS: &[QuantLevel] = &[
    QuantLevel {
        name: "Q1",
        variants: &[variant("IQ1_S", 1.78, 0.076)],
    },
    QuantLevel {
        name: "Q2",
        variants: &[
            variant("IQ2_XXS", 2.2, 0.299),
            variant("IQ2_XS", 2.43, 0.4),
            variant("IQ2_S", 2.55, 0.43),
            variant("IQ2_M", 2.76, 0.47),
        ],
    },
    QuantLevel {
        name: "Q3",
        variants: &[
            variant("IQ3_XXS", 3.21, 0.59),
            variant("IQ3_XS", 3.32, 0.61),
            variant("IQ3_S", 3.52, 0.67),
            variant("IQ3_M", 3.63, 0.69),
        ],
    },
    QuantLevel {
        name: "Q4",
        variants: &[
            variant("IQ4_XS", 4.32, 0.79),
            variant("IQ4_NL", 4.56, 0.8),
            variant("Q4_K_S", 4.57, 0.8),
            variant("Q4_K_M", 4.83, 0.82),
        ],
    },
    QuantLevel {
        name: "Q5",
        variants: &[
            variant("Q5_K_S", 5.52, 0.995),
            variant("Q5_K_M", 5.67, 0.9999),
        ],
    },
    QuantLevel {
        name: "Q6",
        variants: &[variant("Q6_K", 6.57, 1.0)],
    },
    QuantLevel {
        name: "Q8",
        variants: &[variant("Q8_0", 8.0, 1.0)],
    },
    QuantLevel {
        name: "F16",
        variants: &[variant("F16", 16.0, 1.0)],
    },
    QuantLevel {
        name: "F32",
        variants: &[variant("F32", 32.0, 1.0)],
    },
];

/// `i?q<digits>` at the start of a lower-cased scheme identifier.
static LEVEL_PATTERN: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"^i?(q\d+)").ok());

/// The static retention table, lowest precision first.
pub fn levels() -> &'static [QuantLevel] {
    QUANT_LEVELS
}

/// How a scheme identifier was resolved against the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioLookup {
    /// `f16`/`f32` somewhere in the identifier: no adjustment.
    FullPrecision,
    /// The identifier names a known variant.
    Exact { variant: &'static str, ratio: f64 },
    /// The level is known but the variant is not; the level mean is used.
    LevelMean { level: &'static str, ratio: f64 },
    /// No level could be recognised: no adjustment.
    Unknown,
}

impl RatioLookup {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            RatioLookup::FullPrecision => Some(1.0),
            RatioLookup::Exact { ratio, .. } | RatioLookup::LevelMean { ratio, .. } => Some(*ratio),
            RatioLookup::Unknown => None,
        }
    }
}

/// Lower-case and strip underscores, so `Q4_K_M` and `q4km` compare equal.
fn normalize_scheme(scheme: &str) -> String {
    scheme.to_lowercase().replace('_', "")
}

/// Resolve a scheme identifier against the retention table.
pub fn lookup(scheme: &str) -> RatioLookup {
    let lowered = scheme.to_lowercase();
    if lowered.contains("f16") || lowered.contains("f32") {
        return RatioLookup::FullPrecision;
    }

    // The level is read before underscores are dropped so `q4_0` stays level q4.
    let Some(level_token) = LEVEL_PATTERN
        .as_ref()
        .and_then(|re| re.captures(&lowered))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return RatioLookup::Unknown;
    };

    let Some(level) = QUANT_LEVELS
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(&level_token))
    else {
        return RatioLookup::Unknown;
    };

    let normalized = normalize_scheme(scheme);
    if let Some(v) = level
        .variants
        .iter()
        .find(|v| normalize_scheme(v.name) == normalized)
    {
        return RatioLookup::Exact {
            variant: v.name,
            ratio: v.performance_ratio,
        };
    }

    RatioLookup::LevelMean {
        level: level.name,
        ratio: level.mean_ratio(),
    }
}

/// Fraction of the full-precision score retained by `scheme`, if known.
pub fn retention_ratio(scheme: &str) -> Option<f64> {
    lookup(scheme).ratio()
}

/// Estimate the full-precision score of `score` measured under `scheme`.
///
/// Unknown schemes and full-precision formats pass the score through unchanged.
pub fn unquant(score: f64, scheme: &str) -> f64 {
    match lookup(scheme) {
        RatioLookup::Exact { ratio, .. } | RatioLookup::LevelMean { ratio, .. } => score / ratio,
        RatioLookup::FullPrecision | RatioLookup::Unknown => score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_full_precision_passthrough() {
        assert_eq!(unquant(42.5, "F16"), 42.5);
        assert_eq!(unquant(42.5, "f32"), 42.5);
        assert_eq!(unquant(42.5, "model-bf16"), 42.5);
        assert_eq!(lookup("F16"), RatioLookup::FullPrecision);
    }

    #[test]
    fn test_exact_match() {
        assert!(approx(unquant(100.0, "Q6_K"), 100.0));
        assert!(approx(unquant(100.0, "IQ2_XXS"), 100.0 / 0.299));
        assert_eq!(
            lookup("q4_k_m"),
            RatioLookup::Exact {
                variant: "Q4_K_M",
                ratio: 0.82
            }
        );
    }

    #[test]
    fn test_exact_match_ignores_case_and_underscores() {
        assert_eq!(retention_ratio("iq3xs"), Some(0.61));
        assert_eq!(retention_ratio("IQ3_XS"), Some(0.61));
        assert_eq!(retention_ratio("iQ3_xS"), Some(0.61));
    }

    #[test]
    fn test_level_mean_fallback() {
        let expected = (0.79 + 0.8 + 0.8 + 0.82) / 4.0;
        assert!(approx(expected, 0.8025));
        assert!(approx(unquant(80.25, "Q4_WEIRD"), 80.25 / expected));
        assert!(matches!(
            lookup("q4_0"),
            RatioLookup::LevelMean { level: "Q4", .. }
        ));
    }

    #[test]
    fn test_unknown_scheme_passthrough() {
        assert_eq!(unquant(10.0, "gptq-int4"), 10.0);
        assert_eq!(unquant(10.0, "Q7_K"), 10.0);
        assert_eq!(unquant(10.0, ""), 10.0);
        assert_eq!(retention_ratio("awq"), None);
    }

    #[test]
    fn test_table_ratios_are_monotonic_in_bits() {
        let mut variants: Vec<QuantVariant> = levels()
            .iter()
            .flat_map(|l| l.variants.iter().copied())
            .collect();
        variants.sort_by(|a, b| a.bits.total_cmp(&b.bits));
        for pair in variants.windows(2) {
            assert!(pair[0].performance_ratio <= pair[1].performance_ratio);
            assert!(pair[1].performance_ratio <= 1.0);
        }
    }
}
