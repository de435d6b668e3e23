//! Command-line arguments for the `job` binary.

use clap::Parser;
use std::path::PathBuf;

pub const USAGE: &str = "Usage: job <job_definition.yml>";

/// Run a job definition over JSON Lines read from stdin.
#[derive(Debug, Parser)]
#[command(name = "job", version, about)]
pub struct Cli {
    /// Path to the YAML job definition
    pub job_definition: PathBuf,
}
