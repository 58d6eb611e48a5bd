use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use atompub::config::Config;
use atompub::server;
use atompub::service::FeedService;
use atompub::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "atompub", about = "AtomPub-style feed server")]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(long, value_name = "FILE", default_value = "./config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Could not read config file {}", args.config.display()))?;
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::debug!(?config, "Effective configuration");

    let db = match Database::open_with(&config.database_url, config.max_connections).await {
        Ok(db) => db,
        Err(DatabaseError::Locked) => {
            anyhow::bail!("Could not open db: the database is locked by another process");
        }
        Err(e) => return Err(anyhow::anyhow!("Could not open db: {}", e)),
    };

    let service = Arc::new(FeedService::new(db));

    tracing::info!(
        started_at = %Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "Starting atompub"
    );
    server::run_server(config.listen_addr(), service).await
}
