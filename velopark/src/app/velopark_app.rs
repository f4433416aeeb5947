use clap::{Args, Parser, Subcommand};
use velopark_core::model::EngineError;

use crate::app::RunContext;

/// Command line tool for batch analysis of the shared car parking /
/// bike dock occupancy history
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct VeloparkApp {
    #[command(subcommand)]
    pub op: AnalysisOperation,
}

/// file locations shared by every operation
#[derive(Debug, Clone, Args)]
pub struct IoArgs {
    /// semicolon-delimited historical occupancy log
    #[arg(long)]
    pub history_file: String,

    /// entity metadata JSON (id -> class, name, coordinates, capacity)
    #[arg(long)]
    pub metadata_file: String,

    /// directory the artifacts are written to
    #[arg(short, long)]
    pub output_directory: String,

    /// TOML engine configuration; built-in defaults when omitted
    #[arg(short, long)]
    pub config_file: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AnalysisOperation {
    /// compute one correlation artifact per configured lookback window
    Correlations {
        #[command(flatten)]
        io: IoArgs,
    },
    /// compute the saturation rankings and city curves artifact
    Saturation {
        #[command(flatten)]
        io: IoArgs,
    },
    /// run both analyses over one history snapshot
    All {
        #[command(flatten)]
        io: IoArgs,
    },
}

impl AnalysisOperation {
    pub fn run(&self) -> Result<(), EngineError> {
        match self {
            AnalysisOperation::Correlations { io } => {
                RunContext::prepare(io)?.run_correlations()
            }
            AnalysisOperation::Saturation { io } => RunContext::prepare(io)?.run_saturation(),
            AnalysisOperation::All { io } => RunContext::prepare(io)?.run_all(),
        }
    }
}
