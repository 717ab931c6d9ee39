//! HTTP request handlers for the LoRa API.

use crate::error::GatewayError;
use crate::gateway::{GatewayService, HealthReport, ReceivedPacket};
use crate::http::schema::{
    ConnectRequest, ConnectResponse, DisconnectResponse, ErrorResponse, SendResponse,
    StatsResponse,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::warn;
use std::sync::Arc;

/// Any request failure; always reported as `500 {success: false, error}`
#[derive(Debug)]
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request failed: {}", self.0);
        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// POST /api/lora/connect
///
/// An empty body, `{}` and `null` all mean "reconnect with the current configuration".
pub async fn connect(
    State(service): State<Arc<GatewayService>>,
    body: Bytes,
) -> Result<Json<ConnectResponse>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ConnectRequest::default()
    } else {
        serde_json::from_slice::<Option<ConnectRequest>>(&body)
            .map_err(|e| GatewayError::config(format!("invalid connect request: {e}")))?
            .unwrap_or_default()
    };

    let outcome = service.connect(request.into_update()?).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/lora/disconnect
pub async fn disconnect(State(service): State<Arc<GatewayService>>) -> Json<DisconnectResponse> {
    let message = service.disconnect().await;
    Json(DisconnectResponse {
        success: true,
        message,
    })
}

/// POST /api/lora/send - transmit an arbitrary JSON document
pub async fn send(
    State(service): State<Arc<GatewayService>>,
    body: Bytes,
) -> Result<Json<SendResponse>, ApiError> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(GatewayError::Serialization)?;
    let receipt = service.send(&payload).await?;
    Ok(Json(receipt.into()))
}

/// GET /api/lora/poll
pub async fn poll(State(service): State<Arc<GatewayService>>) -> Json<Vec<ReceivedPacket>> {
    Json(service.poll())
}

/// GET /api/lora/stats
pub async fn stats(State(service): State<Arc<GatewayService>>) -> Json<StatsResponse> {
    Json(service.stats().await.into())
}

/// GET /api/health
pub async fn health(State(service): State<Arc<GatewayService>>) -> Json<HealthReport> {
    Json(service.health().await)
}
