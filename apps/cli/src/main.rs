//! # tillbook: Command-Line Entry Point
//!
//! ```text
//! tillbook [--config <file>] <command>
//!
//!   render <document.json> --template <file> [--kind invoice] [--payments <file>]
//!   totals <document.json>
//!   balance <invoice-id>
//!   convert-quote <quote-id>
//!   move-order <order-id> <table-id>
//!   send-invoice <invoice-id> <email> [--subject ..] [--message ..] [--template <id>]
//! ```
//!
//! Output goes to stdout, logs to stderr. A failed command prints
//! `[CODE] message` and exits with status 1.

mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use crate::commands::Command;
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Parser)]
#[command(name = "tillbook", version, about = "Point-of-sale and invoicing tools")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match AppConfig::load(cli.config) {
        Ok(config) => {
            debug!(organization = %config.organization.id, "Config loaded");
            commands::run(cli.command, &config).await
        }
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tillbook_db=trace` - Trace the document store only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}
