//! # LoRa Radio Abstraction
//!
//! This module defines the `LoRaDriver` trait that the gateway uses to talk to a
//! transceiver, the `DriverFactory` that opens one for a given configuration, and
//! the configuration types shared with the HTTP surface. The gateway never looks
//! inside a payload; drivers move opaque bytes.
//!
//! Two radio backends exist, selected once at startup through [`RadioHandle`]:
//! real hardware (any `DriverFactory`, e.g. the RFM9x driver) and simulation.

use crate::constants::{
    DEFAULT_BANDWIDTH_HZ, DEFAULT_CODING_RATE, DEFAULT_FREQUENCY_MHZ, DEFAULT_SPREADING_FACTOR,
    DEFAULT_TX_POWER_DBM,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod hal;
pub mod handle;
pub mod mock;
pub mod rfm9x;
pub mod rfm9x_registers;

pub use hal::{Hal, HalError};
pub use handle::{HardwareRadio, RadioHandle};
pub use rfm9x::{Rfm9xDriver, Rfm9xFactory};

/// Common radio driver errors
#[derive(Error, Debug)]
pub enum RadioError {
    /// Hardware abstraction layer error
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),
    /// Invalid configuration parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    /// Operation timed out
    #[error("Operation timeout: {0}")]
    Timeout(String),
    /// No radio is attached
    #[error("Radio not connected")]
    NotConnected,
    /// Payload exceeds the radio FIFO
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
    /// Device-specific error
    #[error("Device error: {0}")]
    Device(String),
}

/// Radio configuration applied on connect.
///
/// Serialized with the field names the web client expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Carrier frequency in MHz
    #[serde(rename = "frequency")]
    pub frequency_mhz: f64,
    /// Signal bandwidth in Hz
    #[serde(rename = "bandwidth")]
    pub bandwidth_hz: u32,
    /// Coding rate denominator (5 = 4/5 ... 8 = 4/8)
    pub coding_rate: u8,
    /// Spreading factor (6-12)
    pub spreading_factor: u8,
    /// Transmit power in dBm
    #[serde(rename = "tx_power")]
    pub tx_power_dbm: i8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: DEFAULT_FREQUENCY_MHZ,
            bandwidth_hz: DEFAULT_BANDWIDTH_HZ,
            coding_rate: DEFAULT_CODING_RATE,
            spreading_factor: DEFAULT_SPREADING_FACTOR,
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
        }
    }
}

impl RadioConfig {
    /// Returns a copy with every field present in `update` replaced.
    pub fn merged(&self, update: &RadioConfigUpdate) -> Self {
        Self {
            frequency_mhz: update.frequency_mhz.unwrap_or(self.frequency_mhz),
            bandwidth_hz: update.bandwidth_hz.unwrap_or(self.bandwidth_hz),
            coding_rate: update.coding_rate.unwrap_or(self.coding_rate),
            spreading_factor: update.spreading_factor.unwrap_or(self.spreading_factor),
            tx_power_dbm: update.tx_power_dbm.unwrap_or(self.tx_power_dbm),
        }
    }

    /// Checks every field against what an SX127x can be programmed with.
    pub fn validate(&self) -> Result<(), RadioError> {
        if !self.frequency_mhz.is_finite() || !(137.0..=1020.0).contains(&self.frequency_mhz) {
            return Err(RadioError::InvalidParams(format!(
                "frequency {} MHz outside 137-1020 MHz",
                self.frequency_mhz
            )));
        }
        if !(7_800..=500_000).contains(&self.bandwidth_hz) {
            return Err(RadioError::InvalidParams(format!(
                "bandwidth {} Hz outside 7800-500000 Hz",
                self.bandwidth_hz
            )));
        }
        if !(5..=8).contains(&self.coding_rate) {
            return Err(RadioError::InvalidParams(format!(
                "coding rate 4/{} outside 4/5-4/8",
                self.coding_rate
            )));
        }
        if !(6..=12).contains(&self.spreading_factor) {
            return Err(RadioError::InvalidParams(format!(
                "spreading factor SF{} outside SF6-SF12",
                self.spreading_factor
            )));
        }
        if !(5..=23).contains(&self.tx_power_dbm) {
            return Err(RadioError::InvalidParams(format!(
                "tx power {} dBm outside 5-23 dBm",
                self.tx_power_dbm
            )));
        }
        Ok(())
    }

    /// Carrier frequency in Hz
    pub fn frequency_hz(&self) -> u64 {
        (self.frequency_mhz * 1_000_000.0).round() as u64
    }

    /// LoRa symbol duration for the configured SF/BW
    pub fn symbol_time(&self) -> Duration {
        let micros = (1u64 << self.spreading_factor) * 1_000_000 / u64::from(self.bandwidth_hz);
        Duration::from_micros(micros)
    }
}

/// A partial configuration; absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadioConfigUpdate {
    pub frequency_mhz: Option<f64>,
    pub bandwidth_hz: Option<u32>,
    pub coding_rate: Option<u8>,
    pub spreading_factor: Option<u8>,
    pub tx_power_dbm: Option<i8>,
}

impl RadioConfigUpdate {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a successful connect attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Human-readable device name
    pub name: String,
    /// True when no hardware is behind the handle
    pub simulated: bool,
}

/// An inbound frame together with the signal quality observed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Raw payload bytes
    pub data: Vec<u8>,
    /// RSSI in dBm, if the driver reports one
    pub rssi: Option<f64>,
    /// SNR in dB, if the driver reports one
    pub snr: Option<f64>,
}

/// An attached, configured transceiver.
#[async_trait]
pub trait LoRaDriver: Send {
    /// Transmit one packet and wait for completion.
    async fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Wait up to `timeout` for one inbound packet.
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - Packet received
    /// * `Ok(None)` - Nothing arrived before the timeout
    /// * `Err(RadioError)` - Error talking to the radio
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, RadioError>;

    /// RSSI of the last received packet in dBm
    fn last_rssi(&self) -> Option<f64>;

    /// SNR of the last received packet in dB
    fn last_snr(&self) -> Option<f64>;

    /// Put the radio into its lowest-power state before release
    async fn sleep(&mut self) -> Result<(), RadioError>;
}

/// Opens a driver for a configuration.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Initialize the radio with `config`
    async fn open(&self, config: &RadioConfig) -> Result<Box<dyn LoRaDriver>, RadioError>;

    /// Name reported to clients for devices this factory opens
    fn device_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RadioConfig::default();
        assert_eq!(config.frequency_mhz, 915.0);
        assert_eq!(config.bandwidth_hz, 125_000);
        assert_eq!(config.coding_rate, 5);
        assert_eq!(config.spreading_factor, 7);
        assert_eq!(config.tx_power_dbm, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_unspecified_fields() {
        let base = RadioConfig::default().merged(&RadioConfigUpdate {
            frequency_mhz: Some(868.1),
            ..Default::default()
        });
        let next = base.merged(&RadioConfigUpdate {
            tx_power_dbm: Some(17),
            ..Default::default()
        });

        assert_eq!(next.frequency_mhz, 868.1);
        assert_eq!(next.tx_power_dbm, 17);
        assert_eq!(next.bandwidth_hz, 125_000);
        assert_eq!(next.spreading_factor, 7);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let base = RadioConfig {
            spreading_factor: 12,
            ..Default::default()
        };
        assert!(RadioConfigUpdate::default().is_empty());
        assert_eq!(base.merged(&RadioConfigUpdate::default()), base);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let bad = [
            RadioConfig { frequency_mhz: 50.0, ..Default::default() },
            RadioConfig { frequency_mhz: f64::NAN, ..Default::default() },
            RadioConfig { bandwidth_hz: 1_000_000, ..Default::default() },
            RadioConfig { coding_rate: 4, ..Default::default() },
            RadioConfig { spreading_factor: 13, ..Default::default() },
            RadioConfig { tx_power_dbm: 30, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(RadioError::InvalidParams(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(RadioConfig::default()).unwrap();
        assert_eq!(json["frequency"], 915.0);
        assert_eq!(json["bandwidth"], 125_000);
        assert_eq!(json["coding_rate"], 5);
        assert_eq!(json["spreading_factor"], 7);
        assert_eq!(json["tx_power"], 20);
    }

    #[test]
    fn test_symbol_time() {
        let sf12 = RadioConfig {
            spreading_factor: 12,
            ..Default::default()
        };
        assert_eq!(sf12.symbol_time(), Duration::from_micros(32_768));
        assert_eq!(RadioConfig::default().symbol_time(), Duration::from_micros(1_024));
    }
}
