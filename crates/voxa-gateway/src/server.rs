// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use tower_http::cors::CorsLayer;
use voxa_archive::ArchiveSummariser;
use voxa_core::VoxaError;
use voxa_registry::Registry;
use voxa_session::SessionStore;
use voxa_turn::TurnPipeline;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<TurnPipeline>,
    pub sessions: Arc<SessionStore>,
    pub summariser: Arc<ArchiveSummariser>,
    pub registry: Arc<Registry>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full route table.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/sts/audio/stream", post(handlers::post_audio_stream))
        .route("/sts/audio/{audio_id}", get(handlers::get_audio))
        .route("/sts/text", post(handlers::post_text))
        .route("/sts/text/{audio_id}", get(handlers::get_text))
        .route("/sts/moderation/{audio_id}", get(handlers::get_moderation))
        .route("/sts/close/{audio_id}", post(handlers::post_close))
        .route("/sts/end-sequence", patch(handlers::patch_end_sequence))
        .route("/archives", get(handlers::get_archives_by_range))
        .route("/archives/index", get(handlers::get_archive_index))
        .route(
            "/archives/summary",
            get(handlers::get_summary).delete(handlers::delete_summary),
        )
        .route("/archives/{archive_id}", get(handlers::get_archive))
        .route("/sessions/memory", delete(handlers::delete_memory))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), VoxaError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VoxaError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| VoxaError::Internal(format!("gateway server error: {e}")))
}
