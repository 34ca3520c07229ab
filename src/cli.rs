//! CLI argument parsing for perfcheck

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for detection reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "perfcheck")]
#[command(version)]
#[command(about = "Model-based performance degradation detection between two profiles", long_about = None)]
pub struct Cli {
    /// Baseline profile (JSON)
    #[arg(value_name = "BASELINE")]
    pub baseline: PathBuf,

    /// Target profile (JSON)
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Detection strategy to run, repeatable (e.g. -m integral_comparison -m bmoe);
    /// without it the configured rules select the strategies
    #[arg(short = 'm', long = "method", value_name = "NAME")]
    pub methods: Vec<String>,

    /// Models paired between the profiles (best-model, best-param, all-models, ...)
    #[arg(long = "models-strategy", value_name = "STRATEGY")]
    pub models_strategy: Option<String>,

    /// Detection configuration (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also report uids present in only one of the profiles
    #[arg(long = "report-missing")]
    pub report_missing: bool,

    /// Number of points sampled from every model curve
    #[arg(long = "samples", value_name = "N")]
    pub samples: Option<usize>,

    /// Compare profiles even if they were collected differently
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
