//! Gateway server setup
//!
//! Router assembly, dependency wiring, and the serve loop.

mod handler;
mod push;
mod state;

pub use handler::ws_handler;
pub use push::push_handler;
pub use state::GatewayState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use im_cache::{PresenceStore, RedisPool};
use im_common::{AppConfig, AppError, JwtService};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::connection::Registry;
use crate::peer::HttpPeerRouter;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/internal/push", post(push_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: &AppConfig) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to Redis...");
    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    redis_pool
        .health_check()
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    tracing::info!("Redis connection established");

    let presence = Arc::new(PresenceStore::new(redis_pool));
    let jwt = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.token_expiry));
    let peers = Arc::new(HttpPeerRouter::new());

    let registry = Registry::spawn();
    registry.start_sweeper(
        config.heartbeat.sweep_interval_secs,
        config.heartbeat.timeout_secs,
    );

    Ok(GatewayState::new(
        registry,
        presence,
        peers,
        jwt,
        config.gateway.advertise_address(),
    ))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{addr}/ws");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::Server(e.to_string()))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(&config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
