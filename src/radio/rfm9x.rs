//! # RFM9x (SX127x) LoRa Driver
//!
//! LoRa-mode driver for HopeRF RFM95/96/98 modules, the radio found on most
//! Raspberry Pi LoRa HATs. Register access goes through the [`Hal`] trait so the
//! same driver runs against the Raspberry Pi HAL or a test double.
//!
//! The driver keeps the radio in continuous RX between transmissions and polls
//! the IRQ flags for completed packets.

use crate::constants::RFM9X_DEVICE_NAME;
use crate::radio::hal::{Hal, HalError};
use crate::radio::rfm9x_registers::*;
use crate::radio::{DriverFactory, LoRaDriver, RadioConfig, RadioError};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Preamble length in symbols
const PREAMBLE_LEN: u16 = 8;

/// IRQ polling period while waiting for RX/TX completion
const IRQ_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Margin added to the computed time on air before a TX is declared lost
const TX_TIMEOUT_MARGIN: Duration = Duration::from_millis(200);

/// RFM9x driver bound to a HAL
pub struct Rfm9xDriver<H: Hal> {
    hal: H,
    config: RadioConfig,
    last_rssi: Option<f64>,
    last_snr: Option<f64>,
}

impl<H: Hal> Rfm9xDriver<H> {
    /// Reset, identify and configure the radio, leaving it in continuous RX.
    pub async fn open(mut hal: H, config: RadioConfig) -> Result<Self, RadioError> {
        config.validate()?;
        hal.reset()?;

        let version = hal.read_u8(REG_VERSION)?;
        if version != CHIP_VERSION {
            return Err(RadioError::Device(format!(
                "unexpected chip version 0x{version:02X} (expected 0x{CHIP_VERSION:02X}), is the HAT seated?"
            )));
        }

        // LoRa mode can only be selected from sleep
        hal.write_u8(REG_OP_MODE, MODE_LONG_RANGE | MODE_SLEEP)?;
        sleep(Duration::from_millis(10)).await;
        if hal.read_u8(REG_OP_MODE)? & MODE_LONG_RANGE == 0 {
            return Err(RadioError::Device("radio refused LoRa mode".to_string()));
        }

        hal.write_u8(REG_FIFO_TX_BASE_ADDR, 0x00)?;
        hal.write_u8(REG_FIFO_RX_BASE_ADDR, 0x00)?;

        let mut driver = Self {
            hal,
            config,
            last_rssi: None,
            last_snr: None,
        };
        driver.set_mode(MODE_STDBY)?;
        driver.apply_config()?;
        driver.start_receive()?;

        info!("[LoRa] Initialized at {} MHz", config.frequency_mhz);
        info!("[LoRa] TX Power: {} dBm", config.tx_power_dbm);
        info!("[LoRa] Bandwidth: {} kHz", f64::from(config.bandwidth_hz) / 1000.0);
        info!("[LoRa] Spreading Factor: SF{}", config.spreading_factor);

        Ok(driver)
    }

    fn set_mode(&mut self, mode: u8) -> Result<(), HalError> {
        let low_frequency = if self.config.frequency_mhz < 525.0 { 0x08 } else { 0x00 };
        self.hal.write_u8(REG_OP_MODE, MODE_LONG_RANGE | low_frequency | mode)
    }

    fn apply_config(&mut self) -> Result<(), HalError> {
        let config = self.config;

        // Frf = Freq * 2^19 / Fxosc
        let frf = (config.frequency_hz() << 19) / FXOSC_HZ;
        self.hal.write_register(
            REG_FRF_MSB,
            &[(frf >> 16) as u8, (frf >> 8) as u8, frf as u8],
        )?;

        let mc1 = (bandwidth_code(config.bandwidth_hz) << 4) | ((config.coding_rate - 4) << 1);
        self.hal.write_u8(REG_MODEM_CONFIG_1, mc1)?;

        // Payload CRC on
        let mc2 = (config.spreading_factor << 4) | 0x04;
        self.hal.write_u8(REG_MODEM_CONFIG_2, mc2)?;

        // AGC auto on, LDRO mandated once a symbol lasts 16 ms or more
        let ldro = config.symbol_time() >= Duration::from_millis(16);
        let mc3 = (u8::from(ldro) << 3) | 0x04;
        self.hal.write_u8(REG_MODEM_CONFIG_3, mc3)?;

        if config.spreading_factor == 6 {
            self.hal.write_u8(REG_DETECTION_OPTIMIZE, 0xC5)?;
            self.hal.write_u8(REG_DETECTION_THRESHOLD, 0x0C)?;
        } else {
            self.hal.write_u8(REG_DETECTION_OPTIMIZE, 0xC3)?;
            self.hal.write_u8(REG_DETECTION_THRESHOLD, 0x0A)?;
        }

        self.hal
            .write_register(REG_PREAMBLE_MSB, &PREAMBLE_LEN.to_be_bytes())?;

        // PA_BOOST output; +20 dBm and above needs the high power DAC
        let mut power = config.tx_power_dbm.clamp(5, 23);
        if power > 20 {
            self.hal.write_u8(REG_PA_DAC, PA_DAC_HIGH_POWER)?;
            power -= 3;
        } else {
            self.hal.write_u8(REG_PA_DAC, PA_DAC_DEFAULT)?;
        }
        self.hal.write_u8(REG_PA_CONFIG, 0x80 | ((power - 5) as u8 & 0x0F))?;

        // LNA max gain, boost on
        self.hal.write_u8(REG_LNA, 0x23)?;

        // DIO0 = RxDone
        self.hal.write_u8(REG_DIO_MAPPING_1, 0x00)
    }

    fn start_receive(&mut self) -> Result<(), HalError> {
        self.hal.write_u8(REG_IRQ_FLAGS, IRQ_ALL)?;
        self.hal.write_u8(REG_FIFO_ADDR_PTR, 0x00)?;
        self.set_mode(MODE_RX_CONTINUOUS)
    }

    fn read_packet(&mut self) -> Result<Vec<u8>, HalError> {
        let current = self.hal.read_u8(REG_FIFO_RX_CURRENT_ADDR)?;
        let len = self.hal.read_u8(REG_RX_NB_BYTES)? as usize;
        self.hal.write_u8(REG_FIFO_ADDR_PTR, current)?;
        let mut data = vec![0u8; len];
        self.hal.read_register(REG_FIFO, &mut data)?;

        let snr = f64::from(self.hal.read_u8(REG_PKT_SNR_VALUE)? as i8) / 4.0;
        let raw_rssi = f64::from(self.hal.read_u8(REG_PKT_RSSI_VALUE)?);
        self.last_snr = Some(snr);
        self.last_rssi = Some(packet_rssi(self.config.frequency_mhz, raw_rssi, snr));

        Ok(data)
    }
}

#[async_trait]
impl<H: Hal> LoRaDriver for Rfm9xDriver<H> {
    async fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(RadioError::PayloadTooLarge {
                len: data.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        self.set_mode(MODE_STDBY)?;
        self.hal.write_u8(REG_FIFO_ADDR_PTR, 0x00)?;
        self.hal.write_register(REG_FIFO, data)?;
        self.hal.write_u8(REG_PAYLOAD_LENGTH, data.len() as u8)?;
        self.hal.write_u8(REG_IRQ_FLAGS, IRQ_ALL)?;
        self.set_mode(MODE_TX)?;

        let deadline = Instant::now() + time_on_air(&self.config, data.len()) + TX_TIMEOUT_MARGIN;
        loop {
            if self.hal.read_u8(REG_IRQ_FLAGS)? & IRQ_TX_DONE != 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!("[LoRa TX] TX_DONE not raised, returning to receive");
                self.start_receive()?;
                return Err(RadioError::Timeout("transmit did not complete".to_string()));
            }
            sleep(IRQ_POLL_INTERVAL).await;
        }

        self.start_receive()?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, RadioError> {
        let deadline = Instant::now() + timeout;
        loop {
            let flags = self.hal.read_u8(REG_IRQ_FLAGS)?;
            if flags & IRQ_RX_DONE != 0 {
                if flags & IRQ_PAYLOAD_CRC_ERROR != 0 {
                    self.hal.write_u8(REG_IRQ_FLAGS, IRQ_ALL)?;
                    debug!("[LoRa RX] CRC error, frame discarded");
                } else {
                    let data = self.read_packet()?;
                    self.hal.write_u8(REG_IRQ_FLAGS, IRQ_ALL)?;
                    return Ok(Some(data));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(IRQ_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    fn last_rssi(&self) -> Option<f64> {
        self.last_rssi
    }

    fn last_snr(&self) -> Option<f64> {
        self.last_snr
    }

    async fn sleep(&mut self) -> Result<(), RadioError> {
        self.set_mode(MODE_SLEEP)?;
        Ok(())
    }
}

/// Opens an [`Rfm9xDriver`] on a freshly acquired HAL for every connect.
pub struct Rfm9xFactory<H> {
    connect_hal: Box<dyn Fn() -> Result<H, HalError> + Send + Sync>,
}

impl<H: Hal + 'static> Rfm9xFactory<H> {
    /// Create a factory from a HAL constructor
    pub fn new<F>(connect_hal: F) -> Self
    where
        F: Fn() -> Result<H, HalError> + Send + Sync + 'static,
    {
        Self {
            connect_hal: Box::new(connect_hal),
        }
    }
}

#[cfg(feature = "raspberry-pi")]
impl Rfm9xFactory<crate::radio::hal::RaspberryPiHal> {
    /// Factory for a HAT wired to the Raspberry Pi header
    pub fn raspberry_pi(pins: crate::radio::hal::Rfm9xPins) -> Self {
        Self::new(move || crate::radio::hal::RaspberryPiHal::new(&pins))
    }
}

#[async_trait]
impl<H: Hal + 'static> DriverFactory for Rfm9xFactory<H> {
    async fn open(&self, config: &RadioConfig) -> Result<Box<dyn LoRaDriver>, RadioError> {
        let hal = (self.connect_hal)()?;
        let driver = Rfm9xDriver::open(hal, *config).await?;
        Ok(Box::new(driver))
    }

    fn device_name(&self) -> String {
        RFM9X_DEVICE_NAME.to_string()
    }
}

/// MODEM_CONFIG_1 code of the smallest bandwidth step >= `bandwidth_hz`
pub fn bandwidth_code(bandwidth_hz: u32) -> u8 {
    BANDWIDTH_STEPS_HZ
        .iter()
        .position(|&step| step >= bandwidth_hz)
        .unwrap_or(BANDWIDTH_STEPS_HZ.len() - 1) as u8
}

/// Packet RSSI in dBm (SX1276 datasheet 5.5.5)
fn packet_rssi(frequency_mhz: f64, raw_rssi: f64, snr: f64) -> f64 {
    let offset = if frequency_mhz < 779.0 { -164.0 } else { -157.0 };
    if snr < 0.0 {
        offset + raw_rssi + snr
    } else {
        offset + raw_rssi * 16.0 / 15.0
    }
}

/// Time on air of an explicit-header, CRC-enabled packet (SX1276 datasheet 4.1.1.7)
pub fn time_on_air(config: &RadioConfig, payload_len: usize) -> Duration {
    let sf = f64::from(config.spreading_factor);
    let t_sym = config.symbol_time().as_secs_f64();
    let ldro = if config.symbol_time() >= Duration::from_millis(16) { 1.0 } else { 0.0 };
    let cr = f64::from(config.coding_rate);

    let t_preamble = (f64::from(PREAMBLE_LEN) + 4.25) * t_sym;
    let numerator = 8.0 * payload_len as f64 - 4.0 * sf + 28.0 + 16.0;
    let payload_symbols = 8.0 + ((numerator / (4.0 * (sf - 2.0 * ldro))).ceil() * cr).max(0.0);

    Duration::from_secs_f64(t_preamble + payload_symbols * t_sym)
}
