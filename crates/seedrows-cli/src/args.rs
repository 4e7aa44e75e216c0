use std::path::PathBuf;

use clap::{Parser, Subcommand};

use seedrows_core::config::CONFIG_FILE_NAME;

#[derive(Parser, Debug)]
#[command(
    name = "seedrows",
    about = "Generate unique, cross-referenced synthetic tables as delimited text",
    version,
    after_help = "Examples:\n  seedrows generate                          # every table in ./seedrows.toml\n  seedrows generate --table TICKET --rows 500 --seed 42\n  seedrows preview --table CUSTOMER --rows 10\n  seedrows check --config data/seedrows.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate tables and write their output files
    Generate(GenerateArgs),

    /// Print sample rows without writing any files
    Preview(PreviewArgs),

    /// Validate the config and its source files
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the config file
    #[arg(short, long, env = "SEEDROWS_CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Only generate these tables (repeatable; default: all, in config order)
    #[arg(short, long = "table", value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Random seed for deterministic generation (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Row count for every selected table (overrides the config)
    #[arg(long)]
    pub rows: Option<usize>,

    /// Consecutive duplicate-key candidates tolerated before failing
    /// (overrides the config; default retries forever)
    #[arg(long)]
    pub max_attempts: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Path to the config file
    #[arg(short, long, env = "SEEDROWS_CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Only preview these tables
    #[arg(short, long = "table", value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Number of sample rows per table
    #[arg(long, default_value = "5")]
    pub rows: usize,

    /// Random seed (default: the config's seed, else 42)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the config file
    #[arg(short, long, env = "SEEDROWS_CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,
}
