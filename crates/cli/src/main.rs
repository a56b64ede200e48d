//! Sunville CLI - catalog maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Import the menu spreadsheet export into Stripe
//! sunville-cli import "Menu & Price.csv"
//!
//! # Check the file without touching Stripe
//! sunville-cli import menu.csv --dry-run
//! ```
//!
//! # Commands
//!
//! - `import` - Create or update products and prices from the menu CSV

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sunville_cli::commands::import::{self, ImportOptions};

#[derive(Parser)]
#[command(name = "sunville-cli")]
#[command(author, version, about = "Sunville Bakery CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the menu CSV into Stripe
    Import {
        /// Path to the menu CSV export
        path: PathBuf,

        /// Validate the file only; make no Stripe calls
        #[arg(long)]
        dry_run: bool,

        /// Use image URLs as written instead of resolving share links
        #[arg(long)]
        direct_images: bool,
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
        Commands::Import {
            path,
            dry_run,
            direct_images,
        } => {
            let summary = import::run(
                &path,
                ImportOptions {
                    dry_run,
                    direct_images,
                },
            )
            .await?;
            if summary.failed > 0 {
                return Err(format!("{} products failed to import", summary.failed).into());
            }
        }
    }
    Ok(())
}
