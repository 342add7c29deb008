//! Board and output settings.
//!
//! `[board]` holds the reserved names the pipeline keys on (metadata key,
//! internal and derived prefixes, the `formula-map` placeholder) and the
//! opt-in average synthesis. `[output]` only affects the CLI.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of decimal digits every numeric field is rounded to for display.
pub const DISPLAY_PRECISION: i32 = 2;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankboardConfig {
    /// Normalization pipeline settings.
    #[serde(default)]
    pub board: BoardConfig,
    /// Output rendering settings used by the CLI.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Reserved names and prefixes used by the normalization pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Key on the first record that carries dataset metadata.
    #[serde(default = "default_meta_key")]
    pub meta_key: String,
    /// Keys starting with this prefix are internal and never become columns.
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,
    /// Prefix of per-billion-parameter score columns.
    #[serde(default = "default_per_size_prefix")]
    pub per_size_prefix: String,
    /// Prefix of de-quantized score columns.
    #[serde(default = "default_dequant_prefix")]
    pub dequant_prefix: String,
    /// Token replaced by the source column name in `formula-map` templates.
    #[serde(default = "default_column_placeholder")]
    pub column_placeholder: String,
    /// Fill a missing `average` with the mean of each record's metrics.
    #[serde(default)]
    pub synthesize_average: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            meta_key: default_meta_key(),
            internal_prefix: default_internal_prefix(),
            per_size_prefix: default_per_size_prefix(),
            dequant_prefix: default_dequant_prefix(),
            column_placeholder: default_column_placeholder(),
            synthesize_average: false,
        }
    }
}

impl BoardConfig {
    /// Whether `column` was produced by the per-size or de-quantization pass.
    pub fn is_derived(&self, column: &str) -> bool {
        column.starts_with(&self.per_size_prefix) || column.starts_with(&self.dequant_prefix)
    }
}

fn default_meta_key() -> String {
    "__meta__".to_string()
}

fn default_internal_prefix() -> String {
    "_".to_string()
}

fn default_per_size_prefix() -> String {
    "pb-".to_string()
}

fn default_dequant_prefix() -> String {
    "uq-".to_string()
}

fn default_column_placeholder() -> String {
    "{{column}}".to_string()
}

/// CLI output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

fn default_true() -> bool {
    true
}

/// Environment prefix; `__` separates sections, as in
/// `RANKBOARD_BOARD__PER_SIZE_PREFIX=per-b:`.
pub const ENV_PREFIX: &str = "RANKBOARD_";

/// Existing configuration files, lowest priority first: the per-user file,
/// then `.rankboard/config.toml` under `workspace`.
pub fn config_paths(workspace: Option<&Path>) -> Vec<PathBuf> {
    let user = directories::ProjectDirs::from("dev", "rankboard", "rankboard")
        .map(|dirs| dirs.config_dir().join("config.toml"));
    let local = workspace.map(|ws| ws.join(".rankboard").join("config.toml"));
    user.into_iter()
        .chain(local)
        .filter(|path| path.exists())
        .collect()
}

/// Resolve the board and output settings.
///
/// Files from [`config_paths`] override the built-in defaults, `RANKBOARD_*`
/// variables override the files, and `overrides` wins over everything. A
/// workspace can rename the reserved metadata key or the `pb-`/`uq-` prefixes
/// for a leaderboard export that already uses them for source columns.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&RankboardConfig>,
) -> Result<RankboardConfig, Box<figment::Error>> {
    let files = config_paths(workspace);
    let figment = files.iter().fold(
        Figment::from(Serialized::defaults(RankboardConfig::default())),
        |acc, path| acc.merge(Toml::file(path)),
    );
    let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    let figment = match overrides {
        Some(overrides) => figment.merge(Serialized::defaults(overrides)),
        None => figment,
    };
    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RankboardConfig::default();
        assert_eq!(config.board.meta_key, "__meta__");
        assert_eq!(config.board.internal_prefix, "_");
        assert_eq!(config.board.per_size_prefix, "pb-");
        assert_eq!(config.board.dequant_prefix, "uq-");
        assert_eq!(config.board.column_placeholder, "{{column}}");
        assert!(!config.board.synthesize_average);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_is_derived() {
        let board = BoardConfig::default();
        assert!(board.is_derived("pb-average"));
        assert!(board.is_derived("uq-average"));
        assert!(!board.is_derived("average"));
        assert!(!board.is_derived("pbx"));
    }

    #[test]
    fn test_workspace_config_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".rankboard");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[board]\nsynthesize_average = true\nmeta_key = \"_meta\"\n\n[output]\npretty = false\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert!(config.board.synthesize_average);
        assert_eq!(config.board.meta_key, "_meta");
        assert_eq!(config.board.per_size_prefix, "pb-");
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_config_paths_skip_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join(".rankboard").join("config.toml");
        assert!(!config_paths(Some(dir.path())).contains(&local));

        std::fs::create_dir_all(dir.path().join(".rankboard")).unwrap();
        std::fs::write(&local, "[board]\n").unwrap();
        let paths = config_paths(Some(dir.path()));
        assert_eq!(paths.last(), Some(&local));
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = RankboardConfig::default();
        overrides.board.per_size_prefix = "per-b-".into();
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert_eq!(config.board.per_size_prefix, "per-b-");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = RankboardConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RankboardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
