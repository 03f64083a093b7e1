// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use relay_config::model::{ServerConfig, SubscribeConfig};
use relay_core::{ConversationStore, EventLog, GenerationProvider, JobStore, RelayError};
use relay_stream::JobRunner;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Per-job event log, read by subscribers.
    pub log: Arc<dyn EventLog>,
    /// Job metadata and cancellation flags.
    pub jobs: Arc<dyn JobStore>,
    /// Durable conversation history.
    pub conversations: Arc<dyn ConversationStore>,
    /// Producer runner. `None` disables POST /stream/start.
    pub runner: Option<Arc<JobRunner>>,
    /// Generation provider, reported by GET /health.
    pub provider: Option<Arc<dyn GenerationProvider>>,
    /// Subscriber delivery settings.
    pub subscribe: SubscribeConfig,
    /// Model used when a start request names none.
    pub default_model: String,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Cancelled when the server begins shutting down; ends live subscriptions.
    pub shutdown: CancellationToken,
}

/// Build the gateway router:
/// - GET /health
/// - GET /stream/status/{job_id}
/// - POST /stream/cancel/{job_id}
/// - GET /stream/subscribe/{job_id}
/// - POST /stream/start
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/stream/status/{job_id}", get(handlers::get_status))
        .route("/stream/cancel/{job_id}", post(handlers::post_cancel))
        .route("/stream/subscribe/{job_id}", get(handlers::get_subscribe))
        .route("/stream/start", post(handlers::post_start))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind to the configured host:port and serve until `state.shutdown` is
/// cancelled.
///
/// Live subscriptions observe the same token and close with `done`, so the
/// graceful shutdown does not wait for their jobs to finish.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), RelayError> {
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await })
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
