//! hypernews-eco server entry point.
//!
//! Boots the token ledger and the tiered HTTP cache, then serves MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use hypernews_client::{FetchConfig, HttpNetwork, ServiceWorker};
use hypernews_core::ledger::{FileStore, Subscription, TracingObserver};
use hypernews_core::{AppConfig, CacheDb, Ledger};

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    tracing::info!(origin = %config.origin, version = %config.worker.version, "Starting hypernews-eco on stdio transport");

    let mut ledger = Ledger::load(config.ledger.clone(), FileStore::new(config.state_dir.clone()))
        .with_policy(Subscription { active: config.subscribed })
        .with_observer(TracingObserver);
    ledger.check_daily_refill();
    let credited = ledger.process_offline_queue();
    if credited > 0 {
        tracing::info!(credited, "credited offline cache misses");
    }

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let network = HttpNetwork::new(FetchConfig::from_app(&config))?;
    let origin = url::Url::parse(&config.origin).context("invalid origin")?;
    let worker = ServiceWorker::new(db, Arc::new(network), config.worker.clone(), origin);

    match worker.start().await {
        Ok(removed) => tracing::info!(partition = %worker.partitions().static_assets, removed = ?removed, "cache active"),
        Err(e) => tracing::error!(error = %e, "cache inactive; requests go straight to the network"),
    }

    let server = handler::EcoServer::new(state::AppState::new(ledger, worker.clone()));
    let running = serve_server(server, stdio()).await?;
    running.waiting().await?;

    worker.drain().await;
    Ok(())
}
