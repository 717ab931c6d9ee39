//! # Hardware Abstraction Layer for Radio Hardware
//!
//! This module defines the HAL trait used by the RFM9x driver and provides the
//! Raspberry Pi implementation behind the `raspberry-pi` feature.

use thiserror::Error;

/// Errors that can occur during HAL operations
#[derive(Debug, Error)]
pub enum HalError {
    #[error("SPI communication error: {0}")]
    Spi(String),

    #[error("GPIO operation error: {0}")]
    Gpio(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Hardware Abstraction Layer trait for SX127x register access
pub trait Hal: Send {
    /// Write `data` starting at register `addr` (burst write)
    fn write_register(&mut self, addr: u8, data: &[u8]) -> Result<(), HalError>;

    /// Read `buf.len()` bytes starting at register `addr` (burst read)
    fn read_register(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), HalError>;

    /// Pulse the radio's reset line and wait for it to come back up
    fn reset(&mut self) -> Result<(), HalError>;

    /// Write a single register
    fn write_u8(&mut self, addr: u8, value: u8) -> Result<(), HalError> {
        self.write_register(addr, &[value])
    }

    /// Read a single register
    fn read_u8(&mut self, addr: u8) -> Result<u8, HalError> {
        let mut buf = [0u8; 1];
        self.read_register(addr, &mut buf)?;
        Ok(buf[0])
    }
}

// Platform implementations
#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{RaspberryPiHal, Rfm9xPins};
