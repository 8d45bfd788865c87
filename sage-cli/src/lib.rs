//! # sage-cli
//!
//! Command-line front end for Oracle Sage: terminal chat, ingestion, the
//! HTTP API and a connectivity check.

pub mod chat;
pub mod cli;
pub mod doctor;
pub mod ingest;
pub mod settings;

use std::sync::Arc;

use anyhow::bail;
use sage_server::AppState;

pub use cli::{Cli, Command, GlobalArgs, LogFormat};
pub use settings::{Settings, env_file_problem, resolve_api_key};

/// Run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command() {
        Command::Chat => {
            let settings = Settings::from_args(&cli.global)?;
            let pipeline = settings.build_pipeline().await?;
            chat::run(&pipeline, &settings.collection, &settings.store.to_string()).await
        }
        Command::Ingest { paths, recreate } => {
            let settings = Settings::for_ingest(&cli.global).await?;
            let pipeline = settings.build_pipeline().await?;
            ingest::run(&pipeline, &settings.collection, &paths, recreate).await
        }
        Command::Serve { addr } => {
            let settings = Settings::from_args(&cli.global)?;
            let pipeline = settings.build_pipeline().await?;
            sage_server::serve(addr, AppState::new(Arc::new(pipeline), settings.collection)).await
        }
        Command::Doctor => {
            if !doctor::run(&cli.global).await {
                bail!("doctor found problems");
            }
            Ok(())
        }
    }
}
