//! Magic Checkout CLI - Setup tooling and database migrations.
//!
//! # Usage
//!
//! ```bash
//! # Generate shopify.app.toml from config.json
//! mc-cli manifest
//!
//! # Regenerate config.json from an existing shopify.app.toml
//! mc-cli config
//!
//! # Run database migrations
//! mc-cli migrate
//! ```
//!
//! # Commands
//!
//! - `manifest` - Generate the Shopify app manifest from `config.json`
//! - `config` - Seed `config.json` from a manifest's `client_id`
//! - `migrate` - Run database migrations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mc-cli")]
#[command(author, version, about = "Magic Checkout CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shopify.app.toml from config.json
    Manifest {
        /// Path to the config file to read
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Path to write the manifest to
        #[arg(long, default_value = "shopify.app.toml")]
        out: PathBuf,
    },
    /// Seed config.json from a manifest's client_id
    Config {
        /// Path to the manifest to read
        #[arg(long, default_value = "shopify.app.toml")]
        manifest: PathBuf,

        /// Path to write the config file to
        #[arg(long, default_value = "config.json")]
        out: PathBuf,
    },
    /// Run database migrations
    Migrate,
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
        Commands::Manifest { config, out } => commands::manifest::generate(&config, &out)?,
        Commands::Config { manifest, out } => commands::config::generate(&manifest, &out)?,
        Commands::Migrate => commands::migrate::run().await?,
    }
    Ok(())
}
