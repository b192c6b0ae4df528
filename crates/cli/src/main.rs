//! KeyifliBox CLI - Database migrations and catalog import tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! keyiflibox-cli migrate
//!
//! # Bulk-import catalog rows from a CSV file
//! keyiflibox-cli import activity activities.csv
//! keyiflibox-cli import product products.csv
//!
//! # Write a sample CSV template for an import kind
//! keyiflibox-cli template product -o /tmp
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `import` - Bulk-import activities, categories, activity types, or
//!   products
//! - `template` - Generate sample CSV templates for the importer

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::import::ImportKind;

#[derive(Parser)]
#[command(name = "keyiflibox-cli")]
#[command(author, version, about = "KeyifliBox CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Bulk-import catalog rows from a CSV file
    Import {
        /// What the rows describe
        #[arg(value_enum)]
        kind: ImportKind,

        /// Path to the CSV file
        file: String,
    },
    /// Write a sample CSV template for an import kind
    Template {
        /// What the template describes
        #[arg(value_enum)]
        kind: ImportKind,

        /// Directory to write the template into
        #[arg(short, long, default_value = ".")]
        output: String,
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
        Commands::Import { kind, file } => commands::import::run(kind, &file).await?,
        Commands::Template { kind, output } => commands::template::run(kind, &output)?,
    }
    Ok(())
}
