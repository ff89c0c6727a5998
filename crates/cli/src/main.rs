//! Redline CLI - database migrations and operator tasks.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! redline migrate
//!
//! # Create the first (admin) account; password is read from stdin
//! echo "$PASSWORD" | redline admin create -e owner@example.com -n "Shop Owner"
//!
//! # Remove expired sessions
//! redline sessions purge
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create the first account
//! - `sessions purge` - Delete expired sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "redline")]
#[command(author, version, about = "Redline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the admin account
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Session maintenance
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the first account (only while no account exists)
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Delete sessions past their expiry
    Purge,
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
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name } => {
                let password = commands::admin::read_password()?;
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Sessions { action } => match action {
            SessionAction::Purge => {
                commands::sessions::purge().await?;
            }
        },
    }
    Ok(())
}
