//! Route definitions for the gateway API.

use crate::gateway::GatewayService;
use crate::http::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// LoRa API routes
pub fn api_routes() -> Router<Arc<GatewayService>> {
    Router::new()
        .route("/api/lora/connect", post(handlers::connect))
        .route("/api/lora/disconnect", post(handlers::disconnect))
        .route("/api/lora/send", post(handlers::send))
        .route("/api/lora/poll", get(handlers::poll))
        .route("/api/lora/stats", get(handlers::stats))
        .route("/api/health", get(handlers::health))
}

/// Complete application router. The browser UI calls the gateway cross-origin.
pub fn router(service: Arc<GatewayService>) -> Router {
    api_routes()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}
