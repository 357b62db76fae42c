//! credo CLI entry point
//!
//! Parses arguments, sets up logging, runs the command and prints failures as
//! user-friendly errors with suggestions.

use anyhow::Result;
use clap::Parser;
use credo_cli::cli;
use credo_cli::core::user_friendly_error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(cli: &cli::Cli) {
    // --verbose/--quiet win over RUST_LOG; without either, RUST_LOG or warn
    let filter = match cli.log_filter() {
        Some(level) => EnvFilter::new(level),
        None if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        None => EnvFilter::new("warn"),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(&cli);

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
