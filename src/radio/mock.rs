//! Mock radio for testing
//!
//! A scriptable in-memory transceiver that exercises the hardware code paths of
//! the gateway without a HAT attached. Frames, receive errors and open/send
//! failures are queued on the [`MockRadio`] and consumed by the drivers it opens.

use crate::constants::RFM9X_DEVICE_NAME;
use crate::radio::{DriverFactory, LoRaDriver, RadioConfig, RadioError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What the next `receive` call should produce
enum Inbound {
    Frame {
        data: Vec<u8>,
        rssi: Option<f64>,
        snr: Option<f64>,
    },
    Error(String),
    Panic,
}

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Inbound>,
    transmitted: Vec<Vec<u8>>,
    opened: Vec<RadioConfig>,
    next_open_error: Option<String>,
    next_send_error: Option<String>,
    open_delay: Duration,
    sleeps: usize,
}

/// Driver factory whose radios are scripted from the test
#[derive(Clone, Default)]
pub struct MockRadio {
    state: Arc<Mutex<MockState>>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a frame for the attached driver to receive
    pub fn queue_frame(&self, data: &[u8], rssi: Option<f64>, snr: Option<f64>) {
        self.state().inbound.push_back(Inbound::Frame {
            data: data.to_vec(),
            rssi,
            snr,
        });
    }

    /// Make a future `receive` fail with a device error
    pub fn queue_receive_error(&self, message: &str) {
        self.state().inbound.push_back(Inbound::Error(message.to_string()));
    }

    /// Make a future `receive` panic
    pub fn queue_panic(&self) {
        self.state().inbound.push_back(Inbound::Panic);
    }

    /// Fail the next `open` with a device error
    pub fn fail_next_open(&self, message: &str) {
        self.state().next_open_error = Some(message.to_string());
    }

    /// Make every `open` take `delay`, like a radio that is slow to reset
    pub fn set_open_delay(&self, delay: Duration) {
        self.state().open_delay = delay;
    }

    /// Fail the next `transmit` with a device error
    pub fn fail_next_send(&self, message: &str) {
        self.state().next_send_error = Some(message.to_string());
    }

    /// Payloads transmitted so far, in order
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state().transmitted.clone()
    }

    /// Configurations successfully opened so far, in order
    pub fn opened_configs(&self) -> Vec<RadioConfig> {
        self.state().opened.clone()
    }

    /// Number of drivers put to sleep on release
    pub fn sleep_count(&self) -> usize {
        self.state().sleeps
    }

    /// Frames still waiting to be received
    pub fn pending(&self) -> usize {
        self.state().inbound.len()
    }
}

#[async_trait]
impl DriverFactory for MockRadio {
    async fn open(&self, config: &RadioConfig) -> Result<Box<dyn LoRaDriver>, RadioError> {
        config.validate()?;
        let delay = self.state().open_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        {
            let mut state = self.state();
            if let Some(message) = state.next_open_error.take() {
                return Err(RadioError::Device(message));
            }
            state.opened.push(*config);
        }
        Ok(Box::new(MockDriver {
            radio: self.clone(),
            last_rssi: None,
            last_snr: None,
        }))
    }

    fn device_name(&self) -> String {
        RFM9X_DEVICE_NAME.to_string()
    }
}

/// Driver handed out by [`MockRadio`]
pub struct MockDriver {
    radio: MockRadio,
    last_rssi: Option<f64>,
    last_snr: Option<f64>,
}

#[async_trait]
impl LoRaDriver for MockDriver {
    async fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError> {
        let mut state = self.radio.state();
        if let Some(message) = state.next_send_error.take() {
            return Err(RadioError::Device(message));
        }
        state.transmitted.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, RadioError> {
        let next = self.radio.state().inbound.pop_front();
        match next {
            Some(Inbound::Frame { data, rssi, snr }) => {
                self.last_rssi = rssi;
                self.last_snr = snr;
                Ok(Some(data))
            }
            Some(Inbound::Error(message)) => Err(RadioError::Device(message)),
            Some(Inbound::Panic) => panic!("mock radio panicked during receive"),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    fn last_rssi(&self) -> Option<f64> {
        self.last_rssi
    }

    fn last_snr(&self) -> Option<f64> {
        self.last_snr
    }

    async fn sleep(&mut self) -> Result<(), RadioError> {
        self.radio.state().sleeps += 1;
        Ok(())
    }
}
