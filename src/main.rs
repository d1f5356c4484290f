//! Landosol Engine - Gacha and character guessing backend for chat bots
//!
//! The Engine is the backend server that:
//! - Simulates single, ten-pull and pity-ceiling gacha draws per group
//! - Runs timed character guessing rounds (avatar, card and description)
//! - Keeps the gacha pools in sync with the remote publisher
//! - Answers character lookups and hands out daily fortune slips

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{FixedOffset, NaiveTime};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::round_events::round_event_logger;
use crate::infrastructure::state::AppState;
use crate::infrastructure::update_scheduler::pool_update_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "landosol_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Landosol Engine");

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Database: {}", config.database_url);
    tracing::info!("  Data dir: {}", config.data_dir.display());
    tracing::info!("  Default pool: {}", config.default_pool);

    // Initialize application state
    let state = AppState::new(config).await?;
    let state = Arc::new(state);
    tracing::info!("Application state initialized");

    // Start background workers
    let round_logger = tokio::spawn(round_event_logger(state.guess_service.subscribe()));

    let update_worker = if state.config.auto_update {
        let offset = FixedOffset::east_opt(state.config.fortune.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("utc_offset_hours is out of range"))?;
        let at = NaiveTime::from_hms_opt(
            state.config.auto_update_hour,
            state.config.auto_update_minute,
            0,
        )
        .ok_or_else(|| anyhow::anyhow!("auto_update time is out of range"))?;
        Some(tokio::spawn(pool_update_worker(
            state.pool_update_service.clone(),
            offset,
            at,
        )))
    } else {
        tracing::info!("Automatic pool updates disabled");
        None
    };

    tracing::info!("Background workers started");

    // Build the router
    let app = Router::new()
        .route("/health", get(health_check))
        // Merge REST API routes
        .merge(http::create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    let server = axum::serve(listener, app);

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping workers...");
            round_logger.abort();
            if let Some(worker) = update_worker {
                worker.abort();
            }
            tracing::info!("Workers stopped");
        }
    }

    tracing::info!("Landosol Engine stopped");
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
