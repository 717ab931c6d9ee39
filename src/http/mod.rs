//! # HTTP Adapter
//!
//! Thin axum layer mapping the JSON API onto [`GatewayService`](crate::gateway::GatewayService)
//! calls. Every fallible endpoint reports failures as `500 {"success": false, "error": ...}`.

pub mod handlers;
pub mod routes;
pub mod schema;

pub use handlers::ApiError;
pub use routes::router;
