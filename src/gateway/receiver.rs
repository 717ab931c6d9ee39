//! # Background Receive Loop
//!
//! A long-lived tokio task that pulls packets off the radio (or synthesizes them
//! when no hardware exists) and publishes them into the [`PacketBuffer`] and
//! [`StatsRegister`]. The loop never exits on its own: iteration errors are logged
//! and retried after a back-off, and a supervisor restarts the worker task if it
//! panics. Only [`ReceiveLoopHandle::shutdown`] stops it.

use crate::constants::{ERROR_BACKOFF, RECEIVE_TIMEOUT, SIMULATION_INTERVAL};
use crate::error::GatewayError;
use crate::gateway::buffer::PacketBuffer;
use crate::gateway::packet::ReceivedPacket;
use crate::gateway::stats::StatsRegister;
use crate::radio::RadioHandle;
use log::{debug, error, info, warn};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Timings of the receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveLoopConfig {
    /// Longest a single radio receive waits
    pub receive_timeout: Duration,
    /// Delay before each synthetic packet in simulation mode
    pub simulation_interval: Duration,
    /// Pause after a failed iteration or a worker panic
    pub error_backoff: Duration,
}

impl Default for ReceiveLoopConfig {
    fn default() -> Self {
        Self {
            receive_timeout: RECEIVE_TIMEOUT,
            simulation_interval: SIMULATION_INTERVAL,
            error_backoff: ERROR_BACKOFF,
        }
    }
}

/// The producer side of the gateway
#[derive(Clone)]
pub struct ReceiveLoop {
    radio: Arc<RadioHandle>,
    buffer: Arc<PacketBuffer>,
    stats: Arc<StatsRegister>,
    config: ReceiveLoopConfig,
}

impl ReceiveLoop {
    pub fn new(
        radio: Arc<RadioHandle>,
        buffer: Arc<PacketBuffer>,
        stats: Arc<StatsRegister>,
        config: ReceiveLoopConfig,
    ) -> Self {
        Self {
            radio,
            buffer,
            stats,
            config,
        }
    }

    /// Start the supervised loop on the current tokio runtime.
    pub fn spawn(self) -> ReceiveLoopHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(supervise(self, shutdown_rx));
        ReceiveLoopHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    /// One iteration: wait for a packet (or the next synthetic one) and publish it.
    ///
    /// Undecodable frames are counted and discarded here; only radio faults are
    /// returned.
    pub async fn run_once(&self) -> Result<(), GatewayError> {
        if self.radio.is_simulated() {
            sleep(self.config.simulation_interval).await;
            debug!("[MOCK] Generated test packet");
            self.publish(ReceivedPacket::synthetic());
            return Ok(());
        }

        let Some(frame) = self.radio.receive(self.config.receive_timeout).await? else {
            return Ok(());
        };

        let len = frame.data.len();
        match ReceivedPacket::from_frame(frame) {
            Ok(packet) => {
                info!(
                    "[LoRa RX] Received {} bytes (RSSI: {:?} dBm, SNR: {:?} dB)",
                    len,
                    packet.rssi(),
                    packet.snr()
                );
                self.publish(packet);
            }
            Err(e) => {
                self.stats.record_decode_error();
                warn!("[LoRa RX] {e}, packet discarded");
            }
        }
        Ok(())
    }

    /// Buffer a packet and account for it.
    ///
    /// A packet dropped on overflow still counts as received.
    pub fn publish(&self, packet: ReceivedPacket) {
        let (rssi, snr) = (packet.rssi(), packet.snr());
        if self.buffer.push(packet) {
            self.stats.record_received(rssi, snr);
        } else {
            self.stats.record_dropped(rssi, snr);
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Receive loop started");
        loop {
            let outcome = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                outcome = self.run_once() => outcome,
            };

            if let Err(e) = outcome {
                error!("Error in receive loop: {e}");
                tokio::select! {
                    _ = shutdown_requested(&mut shutdown) => break,
                    _ = sleep(self.config.error_backoff) => {}
                }
            }
        }
        info!("Receive loop stopped");
    }
}

/// Restart the worker whenever it panics until shutdown is requested.
async fn supervise(receive_loop: ReceiveLoop, mut shutdown: watch::Receiver<bool>) {
    loop {
        let worker = tokio::spawn(receive_loop.clone().run(shutdown.clone()));
        match worker.await {
            Ok(()) => return,
            Err(e) if e.is_panic() => {
                error!(
                    "Receive loop panicked: {}, restarting",
                    panic_message(e.into_panic())
                );
            }
            Err(e) => {
                warn!("Receive loop task ended unexpectedly: {e}");
                return;
            }
        }

        tokio::select! {
            _ = shutdown_requested(&mut shutdown) => return,
            _ = sleep(receive_loop.config.error_backoff) => {}
        }
    }
}

/// Resolves once shutdown is signalled. If the handle was dropped without
/// signalling, it never resolves and the loop lives as long as the runtime.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owner of a running receive loop
pub struct ReceiveLoopHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReceiveLoopHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        // Err only if the supervisor is already gone
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!("Receive loop supervisor failed: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
