//! Stockpilot CLI - migrations and report polling.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! stockpilot migrate
//!
//! # Start a report and poll it to completion
//! stockpilot report --look-back-days 30 --threshold-qty 5
//!
//! # Run the Stocky full sync to completion
//! stockpilot sync
//!
//! # Re-merge only the most recent purchase orders
//! stockpilot sync --quick
//! ```
//!
//! The `report` and `sync` commands are plain polling clients of a running
//! server; they send the same requests the embedded admin UI sends.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "stockpilot")]
#[command(author, version, about = "Stockpilot CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Start a report job and poll it until it finishes
    Report {
        /// Server base URL
        #[arg(long, env = "STOCKPILOT_URL", default_value = "http://127.0.0.1:3002")]
        server_url: String,

        /// Order window, in days back from now
        #[arg(long)]
        look_back_days: Option<i64>,

        /// Sold-quantity threshold between markdown and restock sections
        #[arg(long)]
        threshold_qty: Option<i64>,
    },
    /// Poll the Stocky purchase-order sync until it finishes
    Sync {
        /// Server base URL
        #[arg(long, env = "STOCKPILOT_URL", default_value = "http://127.0.0.1:3002")]
        server_url: String,

        /// Re-merge only the first page instead of walking everything
        #[arg(long)]
        quick: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Report {
            server_url,
            look_back_days,
            threshold_qty,
        } => commands::report::run(&server_url, look_back_days, threshold_qty).await?,
        Commands::Sync { server_url, quick } => {
            commands::sync::run(&server_url, quick).await?;
        }
    }
    Ok(())
}
