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
    author = "The fragdpd developers",
    version,
    about = "fragdpd CLI - A command-line interface for fragdpd, a molecular fragment Dissipative Particle Dynamics simulation kernel.",
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
    /// Run a DPD simulation described by a scenario file.
    Run(RunArgs),
    /// Parse and validate a scenario file without running it.
    Check(CheckArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub scenario: PathBuf,

    /// Path for the observables output file (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Also write an XYZ trajectory of every output step.
    #[arg(short, long, value_name = "PATH")]
    pub trajectory: Option<PathBuf>,

    // --- Scenario Overrides ---
    /// Override the number of time steps from the scenario file.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the master random seed from the scenario file.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the integrator (gwmvv, scmvv, or pnhln).
    #[arg(long, value_name = "NAME")]
    pub integrator: Option<String>,

    /// Override the output frequency (in steps).
    #[arg(long, value_name = "INT")]
    pub output_frequency: Option<u64>,

    /// Set the number of worker threads for the pair computation.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub scenario: PathBuf,
}
