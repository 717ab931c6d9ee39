//! # Link Statistics
//!
//! Counters and signal-quality gauges for the radio link. Every update and
//! every snapshot takes the same lock, so a reader never sees the counters of one
//! receive event without its RSSI/SNR.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time view of the link counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkStats {
    /// Packets received since startup, including ones dropped on overflow
    pub packets_received: u64,
    /// Packets transmitted since startup
    pub packets_sent: u64,
    /// RSSI of the last received packet (dBm)
    pub last_rssi: Option<f64>,
    /// SNR of the last received packet (dB)
    pub last_snr: Option<f64>,
    /// Received packets discarded because the buffer was full
    pub packets_dropped: u64,
    /// Frames discarded because the payload was not valid UTF-8
    pub decode_errors: u64,
}

/// Thread-safe owner of [`LinkStats`]
#[derive(Debug, Default)]
pub struct StatsRegister {
    inner: Mutex<LinkStats>,
}

impl StatsRegister {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkStats> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one received packet and record its signal quality.
    pub fn record_received(&self, rssi: Option<f64>, snr: Option<f64>) {
        self.record_receive(rssi, snr, false);
    }

    /// Count a received packet that was dropped because the buffer was full.
    ///
    /// It still counts as received; both counters move under one guard.
    pub fn record_dropped(&self, rssi: Option<f64>, snr: Option<f64>) {
        self.record_receive(rssi, snr, true);
    }

    fn record_receive(&self, rssi: Option<f64>, snr: Option<f64>, dropped: bool) {
        let mut stats = self.lock();
        stats.packets_received += 1;
        if dropped {
            stats.packets_dropped += 1;
        }
        stats.last_rssi = rssi;
        stats.last_snr = snr;
    }

    pub fn record_sent(&self) {
        self.lock().packets_sent += 1;
    }

    pub fn record_decode_error(&self) {
        self.lock().decode_errors += 1;
    }

    pub fn snapshot(&self) -> LinkStats {
        self.lock().clone()
    }
}
