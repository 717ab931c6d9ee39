//! # Gateway Core
//!
//! Shared state between the HTTP handlers and the background receive loop:
//!
//! - [`PacketBuffer`]: bounded FIFO of received packets, drop-newest on overflow
//! - [`StatsRegister`]: link counters and last signal quality
//! - [`ReceiveLoop`]: supervised task feeding the two above from the radio
//! - [`GatewayService`]: connect/disconnect/send/poll/stats/health façade

pub mod buffer;
pub mod packet;
pub mod receiver;
pub mod service;
pub mod stats;

pub use buffer::PacketBuffer;
pub use packet::ReceivedPacket;
pub use receiver::{ReceiveLoop, ReceiveLoopConfig, ReceiveLoopHandle};
pub use service::{
    ConnectOutcome, ConnectionState, GatewayService, HealthReport, SendReceipt, StatsReport,
};
pub use stats::{LinkStats, StatsRegister};
