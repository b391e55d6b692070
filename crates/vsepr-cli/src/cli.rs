use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "VSEPR CLI - relax molecules into their VSEPR or measured geometries \
             and report the resulting shape.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a molecule and let it settle into its ideal shape.
    Relax(RelaxArgs),
    /// List the built-in real molecules.
    Presets,
}

/// Where the molecule to relax comes from. Exactly one source is required.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct MoleculeSource {
    /// VSEPR notation such as 'AX3E' or 'AX2E2'; groups start in random directions.
    #[arg(long, value_name = "NOTATION")]
    pub axe: Option<String>,

    /// A built-in real molecule, by name or formula (e.g., 'water', 'SF4').
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// A real molecule described in a TOML shape file.
    #[arg(long, value_name = "PATH")]
    pub shape: Option<PathBuf>,
}

/// Arguments for the `relax` subcommand.
#[derive(Args, Debug)]
pub struct RelaxArgs {
    #[command(flatten)]
    pub source: MoleculeSource,

    /// Path to a simulation configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Relaxation Overrides ---
    /// Override the maximum number of frames to simulate.
    #[arg(short = 'n', long, value_name = "INT")]
    pub frames: Option<usize>,

    /// Override the frame length in seconds.
    #[arg(long, value_name = "FLOAT")]
    pub dt: Option<f64>,

    /// Seed for the random starting directions of AXE molecules.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Evaluate every candidate permutation instead of pruning by the angle bound.
    #[arg(long)]
    pub no_prune: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S relaxation.max-frames=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    // --- Outputs ---
    /// Write every frame's group positions to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub trajectory: Option<PathBuf>,

    /// Write the final report to a TOML file.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}
