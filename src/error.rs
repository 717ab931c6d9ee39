//! # Gateway Error Handling
//!
//! This module defines the GatewayError enum, which represents the different error
//! types that can occur between the HTTP surface and the radio.

use crate::radio::RadioError;
use thiserror::Error;

/// Represents the different error types that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad or missing radio configuration fields.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Hardware initialization, transmit or receive failure.
    #[error("Radio error: {0}")]
    Driver(#[from] RadioError),

    /// An inbound payload could not be decoded as text.
    ///
    /// Only raised inside the receive loop; never returned to a caller.
    #[error("Invalid packet (decode error): {0}")]
    Decode(String),

    /// An outbound payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        GatewayError::Configuration(message.into())
    }
}
