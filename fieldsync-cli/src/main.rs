//! FieldSync CLI
//!
//! Stands in for the presentation layer: resolves a server, runs refreshes
//! and prints what the local store would show.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use fieldsync_core::{load_config, FieldSync};
use fieldsync_types::NewContact;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => fieldsync_core::paths::get_data_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get data directory: {}", e))?,
    };
    let config = load_config(&data_dir).context("Failed to load configuration")?;
    let sync = FieldSync::open(&data_dir, config)
        .await
        .context("Failed to open local state")?;

    match cli.command {
        Commands::Status { json } => commands::status(&sync, json).await,
        Commands::TestServers { json } => commands::test_servers(&sync, json).await,
        Commands::Refresh { domain, json } => {
            commands::refresh(&sync, domain.map(Into::into), json).await
        }
        Commands::List { domain, json } => commands::list(&sync, domain.into(), json),
        Commands::AddContact {
            address,
            city,
            state,
            zip,
            owner,
            email,
            phone,
            fiber,
        } => {
            let contact = NewContact {
                address,
                city,
                state,
                zip_code: zip,
                owner_name: owner,
                owner_email: email,
                owner_phone: phone,
                fiber_available: fiber,
            };
            commands::add_contact(&sync, contact).await
        }
        Commands::ClearCache => commands::clear_cache(&sync).await,
    }
}
