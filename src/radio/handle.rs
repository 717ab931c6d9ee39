//! # Radio Handle
//!
//! The single owner of the transceiver. The gateway picks one variant at startup:
//! `Hardware` when a driver factory is available, `Simulated` otherwise. Nothing
//! else in the crate branches on whether hardware exists.

use crate::constants::{RECEIVE_SLICE, SIMULATED_DEVICE_NAME};
use crate::radio::{DeviceDescriptor, DriverFactory, LoRaDriver, RadioConfig, RadioError, RawFrame};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Radio capability selected at startup
pub enum RadioHandle {
    /// A real transceiver opened through a driver factory
    Hardware(HardwareRadio),
    /// No hardware; sends succeed without transmitting
    Simulated,
}

impl RadioHandle {
    /// Handle backed by real hardware
    pub fn hardware(factory: impl DriverFactory + 'static) -> Self {
        RadioHandle::Hardware(HardwareRadio::new(Box::new(factory)))
    }

    /// Handle with no hardware behind it
    pub fn simulated() -> Self {
        RadioHandle::Simulated
    }

    /// True when a driver factory is present
    pub fn has_hardware(&self) -> bool {
        matches!(self, RadioHandle::Hardware(_))
    }

    pub fn is_simulated(&self) -> bool {
        !self.has_hardware()
    }

    /// True when a hardware driver is currently attached
    pub async fn is_attached(&self) -> bool {
        match self {
            RadioHandle::Hardware(radio) => radio.is_attached().await,
            RadioHandle::Simulated => false,
        }
    }

    /// Initialize the radio with `config`.
    pub async fn connect(&self, config: &RadioConfig) -> Result<DeviceDescriptor, RadioError> {
        match self {
            RadioHandle::Hardware(radio) => radio.connect(config).await,
            RadioHandle::Simulated => {
                info!("[MOCK] LoRa radio initialized (mock mode)");
                Ok(DeviceDescriptor {
                    name: SIMULATED_DEVICE_NAME.to_string(),
                    simulated: true,
                })
            }
        }
    }

    /// Release the radio. Calling it while detached is a no-op.
    pub async fn disconnect(&self) {
        if let RadioHandle::Hardware(radio) = self {
            radio.disconnect().await;
        }
    }

    /// Transmit `data`, returning the number of bytes handed to the radio.
    pub async fn send(&self, data: &[u8]) -> Result<usize, RadioError> {
        match self {
            RadioHandle::Hardware(radio) => radio.send(data).await,
            RadioHandle::Simulated => {
                info!("[MOCK] Would send {} bytes", data.len());
                Ok(data.len())
            }
        }
    }

    /// Wait up to `timeout` for one inbound frame.
    ///
    /// Simulated handles never receive anything; they just wait out the timeout.
    pub async fn receive(&self, timeout: Duration) -> Result<Option<RawFrame>, RadioError> {
        match self {
            RadioHandle::Hardware(radio) => radio.receive(timeout).await,
            RadioHandle::Simulated => {
                sleep(timeout).await;
                Ok(None)
            }
        }
    }
}

/// Factory plus the driver currently attached, if any
pub struct HardwareRadio {
    factory: Box<dyn DriverFactory>,
    driver: Mutex<Option<Box<dyn LoRaDriver>>>,
}

impl HardwareRadio {
    pub fn new(factory: Box<dyn DriverFactory>) -> Self {
        Self {
            factory,
            driver: Mutex::new(None),
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.driver.lock().await.is_some()
    }

    /// Replace any attached driver with one opened for `config`.
    ///
    /// The previous driver is released before the new one is opened since both
    /// would claim the same bus and reset line.
    pub async fn connect(&self, config: &RadioConfig) -> Result<DeviceDescriptor, RadioError> {
        let mut guard = self.driver.lock().await;
        if let Some(old) = guard.take() {
            debug!("Releasing previously attached radio before reconnect");
            release(old).await;
        }

        let driver = self.factory.open(config).await?;
        *guard = Some(driver);

        Ok(DeviceDescriptor {
            name: self.factory.device_name(),
            simulated: false,
        })
    }

    pub async fn disconnect(&self) {
        let old = self.driver.lock().await.take();
        if let Some(old) = old {
            release(old).await;
            info!("[LoRa] Radio released");
        }
    }

    pub async fn send(&self, data: &[u8]) -> Result<usize, RadioError> {
        let mut guard = self.driver.lock().await;
        let driver = guard.as_mut().ok_or(RadioError::NotConnected)?;
        driver.transmit(data).await?;
        info!("[LoRa TX] Sent {} bytes", data.len());
        Ok(data.len())
    }

    /// Wait for a frame in short slices so a concurrent `send` or `connect`
    /// never waits longer than one slice for the driver.
    pub async fn receive(&self, timeout: Duration) -> Result<Option<RawFrame>, RadioError> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let slice = RECEIVE_SLICE.min(deadline - now);

            {
                let mut guard = self.driver.lock().await;
                if let Some(driver) = guard.as_mut() {
                    if let Some(data) = driver.receive(slice).await? {
                        return Ok(Some(RawFrame {
                            data,
                            rssi: driver.last_rssi(),
                            snr: driver.last_snr(),
                        }));
                    }
                    continue;
                }
            }

            // Detached: idle out the slice
            sleep(slice).await;
        }
    }
}

async fn release(mut driver: Box<dyn LoRaDriver>) {
    if let Err(e) = driver.sleep().await {
        warn!("Failed to put radio to sleep on release: {e}");
    }
}
