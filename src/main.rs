//! `job`: transform JSON Lines from stdin through an LLM job definition.

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, USAGE};
use llm_job::Job;
use std::process;
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            process::exit(0);
        }
        Err(_) => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    if !cli.job_definition.exists() {
        eprintln!(
            "Job definition file not found: {}",
            cli.job_definition.display()
        );
        process::exit(1);
    }

    if let Err(e) = logging::init() {
        eprintln!("{}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let job = Job::load(&cli.job_definition)?;
    let ctx = job
        .exec_ctx_builder()
        .openai_from_env()
        .build()
        .context("Failed to set up backend")?;

    let summary = job
        .run(
            &ctx,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            tokio::io::stderr(),
        )
        .await?;

    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        skipped_lines = summary.skipped_lines,
        "done"
    );
    Ok(())
}
