//! Bluefitt Connect CLI - catalog maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Import a product feed into Firestore
//! bf-cli import service-account.json products.json
//!
//! # Transform and batch the feed without writing anything
//! bf-cli import service-account.json products.json --dry-run
//! ```
//!
//! # Commands
//!
//! - `import` - Import a flat JSON product feed into the `products` collection

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bf-cli")]
#[command(author, version, about = "Bluefitt Connect CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a product feed into Firestore
    Import {
        /// Service-account JSON key file
        service_account: PathBuf,

        /// Product feed (JSON array of flat records)
        products: PathBuf,

        /// Run against an in-memory store instead of Firestore
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bf_cli=info,bluefitt_dashboard=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

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
            service_account,
            products,
            dry_run,
        } => {
            let summary = commands::import::run(&service_account, &products, dry_run).await?;
            commands::import::print_summary(&summary, dry_run);
        }
    }
    Ok(())
}
