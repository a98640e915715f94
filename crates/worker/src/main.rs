//! vendavoa worker entry point.
//!
//! Boots the offline gateway: installs the current cache generation,
//! activates it (evicting stale generations), then serves intercepted
//! requests over HTTP. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use vendavoa_client::fetch::{NetClient, NetConfig};
use vendavoa_core::CacheDb;
use vendavoa_core::config::AppConfig;
use vendavoa_worker::{ServiceWorker, gateway};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        origin = %config.app_origin,
        "starting vendavoa worker"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let net = NetClient::new(NetConfig {
        user_agent: config.user_agent.clone(),
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let worker = Arc::new(ServiceWorker::new(db, Arc::new(net), &config)?);

    worker.install().await?;
    worker.activate().await?;

    let app = gateway::router(worker);
    let addr = format!("{}:{}", config.listen_host, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
