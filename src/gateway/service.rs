//! # Gateway Service
//!
//! The façade every request goes through. It owns the radio configuration and
//! connection state and shares the packet buffer and link statistics with the
//! receive loop.
//!
//! `connect` and `disconnect` are serialized by an async lock held across the
//! radio call, so concurrent connects apply in arrival order and the merge always
//! reads the last committed configuration. The committed state itself sits in a
//! short std mutex written once at commit time, so `stats` and `health` never
//! wait behind a radio that is still resetting.

use crate::constants::{DISCONNECT_MESSAGE, SERVICE_NAME};
use crate::error::GatewayError;
use crate::gateway::buffer::PacketBuffer;
use crate::gateway::packet::ReceivedPacket;
use crate::gateway::receiver::{ReceiveLoop, ReceiveLoopConfig, ReceiveLoopHandle};
use crate::gateway::stats::{LinkStats, StatsRegister};
use crate::radio::{RadioConfig, RadioConfigUpdate, RadioError, RadioHandle};
use log::{error, info};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Whether a connect has succeeded since the last disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, Default)]
struct LinkState {
    config: RadioConfig,
    connection: ConnectionState,
}

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    pub device_name: String,
    /// The configuration now in effect
    pub config: RadioConfig,
    pub simulated: bool,
}

/// Result of a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    /// Length of the encoded payload
    pub bytes_sent: usize,
    /// True when nothing was actually transmitted
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub stats: LinkStats,
    pub config: RadioConfig,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub lora_available: bool,
    pub connected: bool,
}

/// Shared gateway state and the operations exposed over HTTP
pub struct GatewayService {
    radio: Arc<RadioHandle>,
    buffer: Arc<PacketBuffer>,
    stats: Arc<StatsRegister>,
    connect_lock: tokio::sync::Mutex<()>,
    link: Mutex<LinkState>,
}

impl GatewayService {
    /// Create a service over `radio` buffering up to `buffer_capacity` packets.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(radio: RadioHandle, buffer_capacity: usize) -> Self {
        Self {
            radio: Arc::new(radio),
            buffer: Arc::new(PacketBuffer::new(buffer_capacity)),
            stats: Arc::new(StatsRegister::new()),
            connect_lock: tokio::sync::Mutex::new(()),
            link: Mutex::new(LinkState::default()),
        }
    }

    fn link(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the receive loop feeding this service.
    pub fn start(&self, config: ReceiveLoopConfig) -> ReceiveLoopHandle {
        ReceiveLoop::new(
            self.radio.clone(),
            self.buffer.clone(),
            self.stats.clone(),
            config,
        )
        .spawn()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Merge `update` over the current configuration and (re)initialize the radio.
    ///
    /// Nothing is committed unless the radio accepts the merged configuration.
    pub async fn connect(&self, update: RadioConfigUpdate) -> Result<ConnectOutcome, GatewayError> {
        let _serial = self.connect_lock.lock().await;
        let config = self.link().config.merged(&update);
        config.validate().map_err(|e| match e {
            RadioError::InvalidParams(message) => GatewayError::Configuration(message),
            other => GatewayError::Driver(other),
        })?;

        match self.radio.connect(&config).await {
            Ok(device) => {
                *self.link() = LinkState {
                    config,
                    connection: ConnectionState::Connected,
                };
                info!("Connected to {} ({:?})", device.name, config);
                Ok(ConnectOutcome {
                    device_name: device.name,
                    config,
                    simulated: device.simulated,
                })
            }
            Err(e) => {
                error!("Failed to connect radio: {e}");
                // A reconnect releases the old driver first; don't claim a link we lost
                if !self.radio.is_attached().await && self.radio.has_hardware() {
                    self.link().connection = ConnectionState::Disconnected;
                }
                Err(e.into())
            }
        }
    }

    /// Release the radio. Always succeeds.
    pub async fn disconnect(&self) -> String {
        let _serial = self.connect_lock.lock().await;
        self.radio.disconnect().await;
        self.link().connection = ConnectionState::Disconnected;
        DISCONNECT_MESSAGE.to_string()
    }

    /// Encode `payload` as compact JSON and transmit it.
    pub async fn send<T>(&self, payload: &T) -> Result<SendReceipt, GatewayError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(payload)?;
        let bytes_sent = self.radio.send(&bytes).await?;
        self.stats.record_sent();
        Ok(SendReceipt {
            bytes_sent,
            simulated: self.radio.is_simulated(),
        })
    }

    /// Take every packet received since the last poll. Never waits on the radio.
    pub fn poll(&self) -> Vec<ReceivedPacket> {
        self.buffer.drain_all()
    }

    /// Never waits on the radio or an in-flight connect.
    pub async fn stats(&self) -> StatsReport {
        let link = *self.link();
        StatsReport {
            stats: self.stats.snapshot(),
            config: link.config,
            connected: self.is_connected(&link),
        }
    }

    pub async fn health(&self) -> HealthReport {
        let link = *self.link();
        HealthReport {
            status: "ok",
            service: SERVICE_NAME,
            lora_available: self.radio.has_hardware(),
            connected: self.is_connected(&link),
        }
    }

    /// Simulation has no link to lose, so it always reports connected
    fn is_connected(&self, link: &LinkState) -> bool {
        link.connection == ConnectionState::Connected || self.radio.is_simulated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::mock::MockRadio;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_simulated_service_reports_connected() {
        let service = GatewayService::new(RadioHandle::simulated(), 10);

        let health = service.health().await;
        assert_eq!(health.status, "ok");
        assert!(!health.lora_available);
        assert!(health.connected);
        assert!(service.stats().await.connected);
    }

    #[tokio::test]
    async fn test_hardware_connection_state() {
        let service = GatewayService::new(RadioHandle::hardware(MockRadio::new()), 10);
        assert!(!service.health().await.connected);

        let outcome = service.connect(RadioConfigUpdate::default()).await.unwrap();
        assert!(!outcome.simulated);
        assert_eq!(outcome.config, RadioConfig::default());
        assert!(service.stats().await.connected);

        assert_eq!(service.disconnect().await, DISCONNECT_MESSAGE);
        assert!(!service.stats().await.connected);
    }

    #[tokio::test]
    async fn test_invalid_update_is_configuration_error() {
        let mock = MockRadio::new();
        let service = GatewayService::new(RadioHandle::hardware(mock.clone()), 10);

        let err = service
            .connect(RadioConfigUpdate {
                spreading_factor: Some(13),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(mock.opened_configs().is_empty());
        assert_eq!(service.stats().await.config, RadioConfig::default());
    }

    #[tokio::test]
    async fn test_zero_buffer_capacity_does_not_panic() {
        let service = GatewayService::new(RadioHandle::simulated(), 0);
        assert_eq!(service.buffer_capacity(), 1);
        assert!(service.poll().is_empty());
    }

    #[tokio::test]
    async fn test_send_counts_and_reports_length() {
        let service = GatewayService::new(RadioHandle::simulated(), 10);
        let payload = json!({"to": "^all", "text": "hi"});

        let receipt = service.send(&payload).await.unwrap();
        assert_eq!(receipt.bytes_sent, serde_json::to_vec(&payload).unwrap().len());
        assert!(receipt.simulated);
        assert_eq!(service.stats().await.stats.packets_sent, 1);
    }

    #[tokio::test]
    async fn test_failed_send_is_not_counted() {
        let service = GatewayService::new(RadioHandle::hardware(MockRadio::new()), 10);

        let err = service.send(&json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Driver(RadioError::NotConnected)));
        assert_eq!(service.stats().await.stats.packets_sent, 0);
    }

    #[tokio::test]
    async fn test_health_and_stats_not_blocked_by_slow_connect() {
        let mock = MockRadio::new();
        mock.set_open_delay(Duration::from_secs(2));
        let service = Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 10));

        let connecting = {
            let service = service.clone();
            tokio::spawn(async move { service.connect(RadioConfigUpdate::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let start = Instant::now();
        let health = service.health().await;
        let stats = service.stats().await;
        assert!(start.elapsed() < Duration::from_millis(200));
        assert!(!health.connected);
        assert!(!stats.connected);

        connecting.await.unwrap().unwrap();
        assert!(service.health().await.connected);
    }

    #[tokio::test]
    async fn test_connects_queue_behind_slow_connect() {
        let mock = MockRadio::new();
        mock.set_open_delay(Duration::from_millis(200));
        let service = Arc::new(GatewayService::new(RadioHandle::hardware(mock.clone()), 10));

        let first = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .connect(RadioConfigUpdate {
                        spreading_factor: Some(9),
                        ..Default::default()
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = service
            .connect(RadioConfigUpdate {
                tx_power_dbm: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        first.await.unwrap().unwrap();

        // The second merge saw the first commit
        assert_eq!(second.config.spreading_factor, 9);
        assert_eq!(second.config.tx_power_dbm, 10);
        assert_eq!(service.stats().await.config, second.config);
    }
}
