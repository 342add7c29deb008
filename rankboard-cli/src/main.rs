//! Rankboard CLI: normalize leaderboard exports from the terminal.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Rankboard: normalize model-benchmark leaderboards for display
#[derive(Parser, Debug)]
#[command(name = "rankboard", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (searched for `.rankboard/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Normalize one or more leaderboard files and write the board as JSON
    Normalize {
        /// Leaderboard JSON files; each is registered under its file stem
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dataset to render (defaults to the first file)
        #[arg(short, long)]
        dataset: Option<String>,

        /// Write output to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// List the normalized columns with their default visibility
    Columns {
        /// Leaderboard JSON file
        file: PathBuf,
    },
    /// Show the numeric range of every column
    Ranges {
        /// Leaderboard JSON file
        file: PathBuf,
    },
    /// De-quantize a single score
    Unquant {
        /// Score measured on the quantized model
        #[arg(allow_negative_numbers = true)]
        score: f64,

        /// Quantization scheme identifier, e.g. Q4_K_M
        scheme: String,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "rankboard", "rankboard")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "rankboard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let config = rankboard_core::config::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    tracing::debug!(
        files = ?rankboard_core::config::config_paths(Some(&workspace)),
        "Loaded configuration"
    );

    let stdout = std::io::stdout();
    commands::handle_command(cli.command, &config, &mut stdout.lock())
}
