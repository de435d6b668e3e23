//! Diagnostic logging for the `job` binary.
//!
//! Logs go to stderr so stdout stays pure JSON Lines. `RUST_LOG` selects the
//! level; without it only warnings and errors are shown.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "warn";

pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
