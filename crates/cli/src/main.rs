//! Grocer CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema and session store)
//! grocer-cli migrate
//!
//! # Insert 100 sample products
//! grocer-cli seed products --count 100
//!
//! # Preview category assignment for uncategorized products
//! grocer-cli categorize --dry-run
//!
//! # Grant the admin role
//! grocer-cli user promote --email admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "grocer-cli")]
#[command(author, version, about = "Grocer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations and create the session table
    Migrate,
    /// Seed the database with sample data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Assign categories to uncategorized products by name
    Categorize {
        /// Print the assignments without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert sample products across all categories
    Products {
        /// Number of products to insert
        #[arg(short, long, default_value_t = 100)]
        count: u32,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Grant the admin role to an existing user
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,
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
        Commands::Seed { target } => match target {
            SeedTarget::Products { count } => commands::seed::products(count).await?,
        },
        Commands::Categorize { dry_run } => commands::categorize::run(dry_run).await?,
        Commands::User { action } => match action {
            UserAction::Promote { email } => commands::user::promote(&email).await?,
        },
    }
    Ok(())
}
