mod admin;
mod config;
mod db;
mod errors;
mod governance;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::governance::cascade::{CascadeSignal, LogOnlyCascade, RedisCascade};
use crate::governance::postgres::PgAccountStore;
use crate::governance::Governance;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tracker API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    // Initialize Redis
    let cascade: Arc<dyn CascadeSignal> = match &config.redis_url {
        Some(url) => {
            let redis = redis::Client::open(url.clone())?;
            info!(
                "Redis client initialized (cascade queue: {})",
                config.cascade_queue
            );
            Arc::new(RedisCascade::new(redis, config.cascade_queue.clone()))
        }
        None => {
            warn!("REDIS_URL not set; cascade deletions will only be logged");
            Arc::new(LogOnlyCascade)
        }
    };

    let governance = Governance::new(Arc::new(PgAccountStore::new(db)), cascade);

    // Re-send cascade signals that failed at deletion time
    let retry = governance.clone();
    let period = Duration::from_secs(config.cascade_retry_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = retry.flush_cascades().await {
                error!("Cascade retry pass failed: {e}");
            }
        }
    });

    let state = AppState { governance };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
