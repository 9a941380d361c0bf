//! Warden server: reads JSON-lines commands on stdin, answers on stdout.

use anyhow::Context;
use tokio::io::{BufReader, stdin, stdout};
use tracing_subscriber::EnvFilter;
use warden_db::{DbManager, run_migrations};
use warden_server::{Dispatcher, ServerConfig, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("load server config")?;

    // Logs go to stderr; stdout carries responses.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).context("parse log filter")?,
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!("Starting Warden server...");

    let manager = DbManager::connect(&config.db)
        .await
        .context("connect to SurrealDB")?;
    run_migrations(manager.client())
        .await
        .context("apply schema migrations")?;

    let dispatcher = Dispatcher::new(manager.client().clone());
    serve(&dispatcher, BufReader::new(stdin()), stdout())
        .await
        .context("serve stdin")?;

    tracing::info!("Warden server stopped.");
    Ok(())
}
