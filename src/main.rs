// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use sentinelscope::cli::{self, Cli};
use sentinelscope::logging::initialize_logging;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    initialize_logging(cli.verbose)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), blocking_threads = cli.blocking_threads, "Starting SentinelScope.");

    // One thread drives every async probe; blocking work goes to a bounded pool.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(usize::from(cli.blocking_threads))
        .build()
        .wrap_err("failed to build the async runtime")?;

    runtime.block_on(cli::run(cli))
}
