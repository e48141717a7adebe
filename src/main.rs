//! Prate CLI entry point.

use anyhow::Result;
use clap::Parser;
use prate::cli::{commands, Cli, Commands};
use prate::config::AppConfig;
use prate::storage::AppStorage;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("prate={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Resolve the storage root and load configuration once
    let root = match &cli.root {
        Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
        None => AppStorage::default_root(),
    };
    let storage = AppStorage::new(root);
    storage.init()?;
    let config = AppConfig::load_or_create(&storage.config_path())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&storage, &config)?;
        }

        Commands::New {
            name,
            description,
            model,
        } => {
            commands::run_new(&storage, &config, name, description, model.clone())?;
        }

        Commands::List => {
            commands::run_list(&storage)?;
        }

        Commands::Delete { name, yes } => {
            commands::run_delete(&storage, name, *yes)?;
        }

        Commands::Add { project, source } => {
            commands::run_add(&storage, config, project, source).await?;
        }

        Commands::Transcribe { project } => {
            commands::run_transcribe(&storage, config, project).await?;
        }

        Commands::Index { project } => {
            commands::run_index(&storage, config, project).await?;
        }

        Commands::Process { project } => {
            commands::run_process(&storage, config, project).await?;
        }

        Commands::Ask { project, question } => {
            commands::run_ask(&storage, config, project, question).await?;
        }

        Commands::Chat { project } => {
            commands::run_chat(&storage, config, project).await?;
        }

        Commands::Remove { project, name } => {
            commands::run_remove(&storage, project, name)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&storage, &config)?;
        }

        Commands::Config { action } => {
            commands::run_config(&storage, config, action)?;
        }
    }

    Ok(())
}
