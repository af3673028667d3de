//! Dewdrop CLI - Database migrations, demo data, and operator tokens.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! dewdrop-cli migrate storefront
//!
//! # Run admin database migrations (orders + session table)
//! dewdrop-cli migrate admin
//!
//! # Run all database migrations
//! dewdrop-cli migrate all
//!
//! # Insert demo catalog and orders
//! dewdrop-cli seed
//!
//! # Mint an operator token for the back-office API
//! dewdrop-cli token issue -e ops@example.com -n "Ops Person" -r admin --hours 4
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert demo products, reviews, and orders
//! - `token issue` - Mint an HS256 operator JWT

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dewdrop-cli")]
#[command(author, version, about = "Dewdrop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: Target,
    },
    /// Insert demo data
    Seed {
        #[command(subcommand)]
        target: Option<Target>,
    },
    /// Manage operator tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum Target {
    /// Storefront database
    Storefront,
    /// Admin database
    Admin,
    /// Both databases
    All,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Mint a signed operator token
    Issue {
        /// Operator email address
        #[arg(short, long)]
        email: String,

        /// Operator display name
        #[arg(short, long)]
        name: String,

        /// Role (`super_admin`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Lifetime in hours
        #[arg(long, default_value_t = dewdrop_admin::services::auth::DEFAULT_TOKEN_HOURS)]
        hours: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dewdrop_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            Target::Storefront => commands::migrate::storefront().await?,
            Target::Admin => commands::migrate::admin().await?,
            Target::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Seed { target } => match target.unwrap_or(Target::All) {
            Target::Storefront => commands::seed::storefront().await?,
            Target::Admin => commands::seed::admin().await?,
            Target::All => {
                commands::seed::storefront().await?;
                commands::seed::admin().await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue {
                email,
                name,
                role,
                hours,
            } => commands::token::issue(&email, &name, &role, hours)?,
        },
    }
    Ok(())
}
