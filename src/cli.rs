//! CLI argument parsing for Llamada

use crate::config::{EngineConfig, GroupingMode, RankPolicy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// JSON report for machine parsing
    Json,
    /// CSV, one row per time slot, for spreadsheet analysis
    Csv,
}

/// Ranking key for best call windows
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RankBy {
    /// Success probability, then confidence
    Success,
    /// Raw pickup rate, then duration
    Pickup,
}

#[derive(Parser, Debug)]
#[command(name = "llamada")]
#[command(version)]
#[command(about = "Micro-cluster tele-calling data and discover the best call windows", long_about = None)]
pub struct Cli {
    /// Input file: a JSON array or JSON-lines stream of contact rows
    pub input: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Rows normalized per ingestion chunk
    #[arg(long = "chunk-size", value_name = "ROWS", default_value = "100000")]
    pub chunk_size: usize,

    /// Stop reading the input after this many rows
    #[arg(long = "limit", value_name = "ROWS")]
    pub limit: Option<usize>,

    /// Reference date for age computation (YYYY-MM-DD; default today)
    #[arg(long = "reference-date", value_name = "DATE")]
    pub reference_date: Option<String>,

    /// Minimum member count for a qualifying cluster
    #[arg(long = "min-cluster-size", value_name = "N", default_value = "6000")]
    pub min_cluster_size: usize,

    /// Max pickup-rate gap (percentage points) merged into one slot
    #[arg(long = "pickup-threshold", value_name = "PP", default_value = "3.0")]
    pub pickup_threshold: f32,

    /// Max call-duration gap (seconds) merged into one slot
    #[arg(long = "duration-threshold", value_name = "SECS", default_value = "30.0")]
    pub duration_threshold: f32,

    /// Minimum sample count for an hour to enter segmentation
    #[arg(long = "min-samples", value_name = "N", default_value = "50")]
    pub min_samples: usize,

    /// Partition by age bracket x income bracket before searching the
    /// remaining fields
    #[arg(long = "stratified")]
    pub stratified: bool,

    /// Ranking key for best-time selection
    #[arg(long = "rank-by", value_enum, default_value = "success")]
    pub rank_by: RankBy,

    /// TOML field spec overriding the built-in grouping fields
    #[arg(long = "fields", value_name = "TOML")]
    pub fields: Option<PathBuf>,

    /// Refine each cluster through a local text-generation model
    #[arg(long = "refine", value_name = "MODEL")]
    pub refine: Option<String>,

    /// Program used for --refine
    #[arg(long = "refine-cmd", value_name = "PROGRAM", default_value = "ollama")]
    pub refine_cmd: String,
}

impl Cli {
    /// Engine configuration from the parsed flags.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_cluster_size: self.min_cluster_size,
            pickup_threshold: self.pickup_threshold,
            duration_threshold: self.duration_threshold,
            min_samples: self.min_samples,
            grouping: if self.stratified {
                GroupingMode::Stratified
            } else {
                GroupingMode::Unstratified
            },
            rank: match self.rank_by {
                RankBy::Success => RankPolicy::SuccessConfidence,
                RankBy::Pickup => RankPolicy::RawPerformance,
            },
        }
    }
}
