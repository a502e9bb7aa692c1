//! Guardian CLI - Lightweight Bungie.net platform client
//!
//! Logs in through OAuth, queries Destiny 2 accounts and inventories, and
//! looks up manifest definitions from the terminal.

mod api;
mod auth;
mod commands;
mod config;
mod manifest;
mod models;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::ServiceError;
use crate::commands::Session;
use crate::config::Config;
use crate::manifest::TableName;

#[derive(Parser)]
#[command(name = "guardian-cli")]
#[command(about = "Lightweight CLI client for the Bungie.net platform API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Bungie.net
    Login {
        /// Print a new login URL even if stored credentials still work
        #[arg(short, long)]
        force: bool,
    },

    /// Trade an authorization code or refresh token for new credentials
    Redeem {
        /// Authorization code from the OAuth redirect
        #[arg(long)]
        code: Option<String>,

        /// Refresh token to trade instead of a code
        #[arg(long)]
        refresh_token: Option<String>,
    },

    /// Refresh the access token using the stored refresh token
    Refresh,

    /// Log out and clear stored credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Show current user info (verify auth works)
    Whoami,

    /// List linked Destiny accounts
    Accounts,

    /// List items carried by your characters
    Inventory,

    /// Look up a manifest definition by hash
    Lookup {
        /// Table name, e.g. InventoryItem or DestinyStatDefinition
        #[arg(short, long)]
        table: TableName,

        /// Definition hash
        #[arg(long)]
        hash: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = Config::load()?.validate()?;
    let session = Session::open(settings)?;

    let result = run(&session, cli.command).await;
    if let Err(e) = &result {
        if let Some(service) = e.chain().find_map(|c| c.downcast_ref::<ServiceError>()) {
            eprintln!("{}", service.category.message());
        }
    }
    result
}

async fn run(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Login { force } => {
            tracing::info!("Starting authentication flow...");
            session.login(force).await?;
        }
        Commands::Redeem {
            code,
            refresh_token,
        } => {
            session.redeem(code, refresh_token).await?;
        }
        Commands::Refresh => {
            session.refresh().await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            session.logout()?;
        }
        Commands::Status => {
            session.status();
        }
        Commands::Whoami => {
            session.whoami().await?;
        }
        Commands::Accounts => {
            session.accounts().await?;
        }
        Commands::Inventory => {
            tracing::info!("Loading inventory...");
            session.inventory().await?;
        }
        Commands::Lookup { table, hash } => {
            session.lookup(table, hash).await?;
        }
    }

    Ok(())
}
