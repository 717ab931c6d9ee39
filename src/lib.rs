//! # lora-hat-gateway - HTTP Gateway for Raspberry Pi LoRa HATs
//!
//! Bridges an RFM9x (SX127x) LoRa transceiver to HTTP clients. A background task
//! drains inbound packets into a bounded buffer while request handlers configure
//! the radio, transmit JSON payloads and poll for received packets.
//!
//! ## Features
//!
//! - RFM9x driver over a small register HAL (Raspberry Pi via `rppal` behind the
//!   `raspberry-pi` feature)
//! - Simulation mode when no hardware is available, producing a test packet every
//!   few seconds
//! - Bounded packet buffer that drops new packets when full and never blocks the radio
//! - Link statistics (packets sent/received/dropped, last RSSI and SNR)
//! - JSON API served by axum with permissive CORS
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lora_hat_gateway::{http, GatewayService, RadioHandle, ReceiveLoopConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> std::io::Result<()> {
//! let service = Arc::new(GatewayService::new(RadioHandle::simulated(), 100));
//! let receiver = service.start(ReceiveLoopConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, http::router(service)).await?;
//! receiver.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logging;
pub mod radio;

pub use crate::error::GatewayError;
pub use crate::logging::{init_logger_with_default, log_info};

// Gateway core
pub use gateway::{
    GatewayService, LinkStats, PacketBuffer, ReceiveLoop, ReceiveLoopConfig, ReceiveLoopHandle,
    ReceivedPacket, StatsRegister,
};

// Radio layer
pub use radio::{
    DeviceDescriptor, DriverFactory, LoRaDriver, RadioConfig, RadioConfigUpdate, RadioError,
    RadioHandle,
};
