use clap::Parser;
use std::path::PathBuf;

use crate::logging::LogLevel;

/// Polaris: replay a spherical position sensor scenario against a reference
/// estimator core and exercise (re-)initialization.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/spherical_demo.toml"
    )]
    pub scenario: PathBuf,

    /// Overrides the scenario's RNG seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[arg(long, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}
