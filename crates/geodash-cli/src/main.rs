//! geodash CLI - command-line adapter for spec §6.2's operations.

mod cli;
mod commands;
mod config;
mod errors;
mod output;
mod progress;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_level = commands::effective_log_level(&cli);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = commands::execute(cli).await;
    std::process::exit(exit_code);
}
