//! Gateway Constants
//!
//! Radio defaults, loop timings and the identity strings reported over HTTP.

use std::time::Duration;

/// Default carrier frequency in MHz (US915 band)
pub const DEFAULT_FREQUENCY_MHZ: f64 = 915.0;

/// Default signal bandwidth in Hz
pub const DEFAULT_BANDWIDTH_HZ: u32 = 125_000;

/// Default coding rate denominator (4/5)
pub const DEFAULT_CODING_RATE: u8 = 5;

/// Default spreading factor
pub const DEFAULT_SPREADING_FACTOR: u8 = 7;

/// Default transmit power in dBm
pub const DEFAULT_TX_POWER_DBM: i8 = 20;

/// Default number of received packets held between polls
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// How long one receive-loop iteration waits on the radio
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Interval between synthetic packets in simulation mode
pub const SIMULATION_INTERVAL: Duration = Duration::from_secs(5);

/// Pause after a failed receive-loop iteration
pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Longest a single receive wait holds the driver lock
pub const RECEIVE_SLICE: Duration = Duration::from_millis(50);

/// Service name reported by the health probe
pub const SERVICE_NAME: &str = "gatemesh-lora-hat";

/// Device name reported for the RFM9x HAT
pub const RFM9X_DEVICE_NAME: &str = "Raspberry Pi LoRa HAT (RFM9x)";

/// Device name reported in simulation mode
pub const SIMULATED_DEVICE_NAME: &str = "Simulated LoRa radio";

/// Payload of the synthetic packet produced in simulation mode
pub const SIMULATED_PAYLOAD: &str = r#"{"from":"!12345678","to":"^all","test":true}"#;

/// RSSI reported for synthetic packets (dBm)
pub const SIMULATED_RSSI_DBM: f64 = -45.0;

/// SNR reported for synthetic packets (dB)
pub const SIMULATED_SNR_DB: f64 = 8.5;

/// Message returned by the disconnect operation
pub const DISCONNECT_MESSAGE: &str = "Disconnected from LoRa radio";
