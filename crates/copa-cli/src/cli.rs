//! Command structures and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cost-optimal VM allocation planner", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a problem or solution document
    Validate {
        /// Path to the document (plain or gzipped YAML)
        path: PathBuf,

        /// Also print a summary of the document contents
        #[arg(short, long)]
        verbose: bool,
    },
    /// Solve the reservation phase, optionally replaying a period
    Solve {
        /// Path to the problem document
        path: PathBuf,

        /// Id of the problem to solve the reservation phase on
        #[arg(long)]
        phase_i_id: String,

        /// Id of the problem whose workloads replay through the timeslot
        /// phase (may equal the reservation problem)
        #[arg(long)]
        phase_ii_id: Option<String>,

        /// Relative MIP gap at which the engine may stop
        #[arg(long)]
        frac_gap: Option<f64>,

        /// Wall-clock budget per engine call, in seconds
        #[arg(long)]
        max_seconds: Option<f64>,

        /// Engine worker threads
        #[arg(long, default_value_t = 1)]
        threads: u32,

        /// Engine random seed
        #[arg(long)]
        seed: Option<i32>,

        /// Divide integer workloads and performances by their gcd before
        /// formulating
        #[arg(long)]
        gcd: bool,

        /// Write the solution document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
