//! Received packet records handed to poll callers.

use crate::constants::{SIMULATED_PAYLOAD, SIMULATED_RSSI_DBM, SIMULATED_SNR_DB};
use crate::error::GatewayError;
use crate::radio::RawFrame;
use chrono::Utc;
use serde::Serialize;

/// One inbound packet. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedPacket {
    data: String,
    rssi: Option<f64>,
    snr: Option<f64>,
    timestamp: f64,
}

impl ReceivedPacket {
    pub fn new(data: String, rssi: Option<f64>, snr: Option<f64>, timestamp: f64) -> Self {
        Self {
            data,
            rssi,
            snr,
            timestamp,
        }
    }

    /// Decode a raw frame as UTF-8 text, stamping it with the current time.
    pub fn from_frame(frame: RawFrame) -> Result<Self, GatewayError> {
        let RawFrame { data, rssi, snr } = frame;
        let text = String::from_utf8(data).map_err(|e| {
            GatewayError::Decode(format!("{e} (payload {})", hex::encode(e.as_bytes())))
        })?;
        Ok(Self::new(text, rssi, snr, unix_now()))
    }

    /// The fixed test packet produced in simulation mode
    pub fn synthetic() -> Self {
        Self::new(
            SIMULATED_PAYLOAD.to_string(),
            Some(SIMULATED_RSSI_DBM),
            Some(SIMULATED_SNR_DB),
            unix_now(),
        )
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn rssi(&self) -> Option<f64> {
        self.rssi
    }

    pub fn snr(&self) -> Option<f64> {
        self.snr
    }

    /// Receive time in Unix seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Current Unix time in seconds with sub-second precision
pub fn unix_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frame_decodes_text() {
        let packet = ReceivedPacket::from_frame(RawFrame {
            data: b"{\"hello\":1}".to_vec(),
            rssi: Some(-90.0),
            snr: None,
        })
        .unwrap();

        assert_eq!(packet.data(), "{\"hello\":1}");
        assert_eq!(packet.rssi(), Some(-90.0));
        assert_eq!(packet.snr(), None);
        assert!(packet.timestamp() > 1_600_000_000.0);
    }

    #[test]
    fn test_from_frame_rejects_invalid_utf8() {
        let err = ReceivedPacket::from_frame(RawFrame {
            data: vec![0x48, 0xFF, 0xFE],
            rssi: None,
            snr: None,
        })
        .unwrap_err();

        assert!(matches!(err, GatewayError::Decode(_)));
        assert!(err.to_string().contains("48fffe"));
    }

    #[test]
    fn test_json_shape() {
        let packet = ReceivedPacket::new("hi".into(), None, Some(2.5), 1_700_000_000.25);
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": "hi", "rssi": null, "snr": 2.5, "timestamp": 1_700_000_000.25})
        );
    }

    #[test]
    fn test_synthetic_packet() {
        let packet = ReceivedPacket::synthetic();
        assert_eq!(packet.rssi(), Some(-45.0));
        assert_eq!(packet.snr(), Some(8.5));
        assert!(packet.data().contains("\"test\":true"));
    }
}
