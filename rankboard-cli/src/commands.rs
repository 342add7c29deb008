//! CLI subcommand handlers.

use crate::Commands;
use anyhow::Context;
use rankboard_core::quant::{self, RatioLookup};
use rankboard_core::{DatasetRegistry, Leaderboard, NormalizedBoard, RankboardConfig, RawRecord};
use std::io::Write;
use std::path::Path;

/// Handle a CLI subcommand, writing its report to `out`.
pub fn handle_command(
    command: Commands,
    config: &RankboardConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Normalize {
            files,
            dataset,
            output,
            compact,
        } => {
            let pretty = config.output.pretty && !compact;
            let json = handle_normalize(&files, dataset.as_deref(), config, pretty)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json.as_bytes())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Wrote normalized board");
                }
                None => writeln!(out, "{json}")?,
            }
            Ok(())
        }
        Commands::Columns { file } => {
            let board = build_one(&file, config)?;
            for (column, visible) in board.visibility_defaults() {
                let mark = if visible { "visible" } else { "hidden" };
                writeln!(out, "{column}\t{mark}")?;
            }
            Ok(())
        }
        Commands::Ranges { file } => {
            let board = build_one(&file, config)?;
            for range in board.column_ranges() {
                writeln!(out, "{}\t{}\t{}", range.column, range.min, range.max)?;
            }
            Ok(())
        }
        Commands::Unquant { score, scheme } => {
            writeln!(out, "{}", describe_unquant(score, &scheme))?;
            Ok(())
        }
    }
}

/// Read a leaderboard file: a JSON array of objects.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<RawRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Loaded leaderboard file");
    Ok(records)
}

/// Registry name for a leaderboard file: its file stem.
fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn handle_normalize(
    files: &[std::path::PathBuf],
    dataset: Option<&str>,
    config: &RankboardConfig,
    pretty: bool,
) -> anyhow::Result<String> {
    let mut registry = DatasetRegistry::new(Leaderboard::new(config.board.clone()));
    for path in files {
        registry.insert(dataset_name(path), load_records(path)?);
    }

    let name = match dataset {
        Some(name) => name.to_string(),
        None => registry
            .names()
            .first()
            .map(|n| n.to_string())
            .context("No leaderboard files given")?,
    };
    let available = registry.names().join(", ");
    let board = match registry.board(&name) {
        Some(result) => result.with_context(|| format!("Failed to normalize dataset '{name}'"))?,
        None => anyhow::bail!("Unknown dataset '{name}' (available: {available})"),
    };

    let json = if pretty {
        serde_json::to_string_pretty(board)?
    } else {
        serde_json::to_string(board)?
    };
    Ok(json)
}

fn build_one(path: &Path, config: &RankboardConfig) -> anyhow::Result<NormalizedBoard> {
    let records = load_records(path)?;
    Leaderboard::new(config.board.clone())
        .build(&records)
        .with_context(|| format!("Failed to normalize {}", path.display()))
}

/// One-line report of a de-quantized score and how the ratio was resolved.
fn describe_unquant(score: f64, scheme: &str) -> String {
    let value = quant::unquant(score, scheme);
    let how = match quant::lookup(scheme) {
        RatioLookup::FullPrecision => "full precision".to_string(),
        RatioLookup::Exact { variant, ratio } => format!("variant {variant}, ratio {ratio}"),
        RatioLookup::LevelMean { level, ratio } => format!("level {level} mean, ratio {ratio}"),
        RatioLookup::Unknown => "unknown scheme, unchanged".to_string(),
    };
    format!("{value}\t{how}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(command: Commands) -> anyhow::Result<String> {
        let mut out = Vec::new();
        handle_command(command, &RankboardConfig::default(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_normalize_selects_dataset_by_stem() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "eval.json", r#"[{"model": "a", "x": 1}]"#);
        let second = write(&dir, "oll.json", r#"[{"model": "b", "size": 4, "y": 2}]"#);

        let text = run(Commands::Normalize {
            files: vec![first, second],
            dataset: Some("oll".into()),
            output: None,
            compact: true,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["catalog"], serde_json::json!(["model", "size", "y", "pb-y"]));
        assert_eq!(value["data"][0]["pb-y"], serde_json::json!(0.5));
    }

    #[test]
    fn test_normalize_defaults_to_first_file_and_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "eval.json", r#"[{"model": "a", "x": 1}, {"model": "b"}]"#);
        let output = dir.path().join("out.json");

        let text = run(Commands::Normalize {
            files: vec![input],
            dataset: None,
            output: Some(output.clone()),
            compact: false,
        })
        .unwrap();
        assert!(text.is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["data"][1]["x"], serde_json::Value::Null);
    }

    #[test]
    fn test_normalize_unknown_dataset() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "eval.json", r#"[{"model": "a"}]"#);
        let err = run(Commands::Normalize {
            files: vec![input],
            dataset: Some("missing".into()),
            output: None,
            compact: true,
        })
        .unwrap_err();
        assert!(err.to_string().contains("Unknown dataset 'missing'"));
    }

    #[test]
    fn test_load_rejects_non_array() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#"{"model": "a"}"#);
        assert!(load_records(&path).is_err());
    }

    #[test]
    fn test_columns_and_ranges() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "eval.json",
            r#"[{"model": "a", "size": 2, "x": 4}, {"model": "b", "size": 1, "x": 1}]"#,
        );

        let columns = run(Commands::Columns { file: path.clone() }).unwrap();
        assert_eq!(
            columns,
            "model\tvisible\nsize\tvisible\nx\tvisible\npb-x\thidden\n"
        );

        let ranges = run(Commands::Ranges { file: path }).unwrap();
        assert_eq!(ranges, "size\t1\t2\nx\t1\t4\npb-x\t1\t2\n");
    }

    #[test]
    fn test_describe_unquant() {
        assert_eq!(describe_unquant(7.0, "F16"), "7\tfull precision");
        assert_eq!(describe_unquant(50.0, "Q6_K"), "50\tvariant Q6_K, ratio 1");
        assert_eq!(describe_unquant(3.0, "mystery"), "3\tunknown scheme, unchanged");
        assert!(describe_unquant(80.25, "Q4_WEIRD").contains("level Q4 mean"));
    }
}
