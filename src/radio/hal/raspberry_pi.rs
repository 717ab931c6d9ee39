//! # Raspberry Pi HAL Implementation
//!
//! Hardware abstraction layer for RFM95/96/98 (SX127x) LoRa HATs on Raspberry Pi,
//! providing SPI register access and reset control through `rppal`.
//!
//! ## Pinout (Adafruit RFM9x bonnet wiring)
//! ```text
//! Pi Pin │ BCM GPIO │ RFM9x Pin │ Function
//! ───────┼──────────┼───────────┼─────────────
//! 19     │ GPIO 10  │ MOSI      │ SPI data out
//! 21     │ GPIO 9   │ MISO      │ SPI data in
//! 23     │ GPIO 11  │ SCK       │ SPI clock
//! 26     │ GPIO 7   │ CS        │ Chip select (CE1)
//! 22     │ GPIO 25  │ RST       │ Reset (output, active low)
//! ```
//!
//! SPI must be enabled in `/boot/config.txt` (`dtparam=spi=on`).

use crate::radio::hal::{Hal, HalError};
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::thread;
use std::time::Duration;

/// SPI clock for register access; the SX127x tolerates up to 10 MHz
const SPI_CLOCK_HZ: u32 = 5_000_000;

/// GPIO wiring for an RFM9x module
#[derive(Debug, Clone)]
pub struct Rfm9xPins {
    /// SPI bus number (0 or 1)
    pub spi_bus: u8,
    /// Chip select line on that bus (0 = CE0, 1 = CE1)
    pub chip_select: u8,
    /// RESET pin (BCM numbering)
    pub reset: u8,
}

impl Default for Rfm9xPins {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 1, // CE1
            reset: 25,      // GPIO 25 (Pin 22)
        }
    }
}

/// Raspberry Pi HAL for an RFM9x radio
pub struct RaspberryPiHal {
    spi: Spi,
    reset_pin: OutputPin,
}

impl RaspberryPiHal {
    /// Open the SPI device and claim the reset pin.
    pub fn new(pins: &Rfm9xPins) -> Result<Self, HalError> {
        let bus = match pins.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => {
                return Err(HalError::InvalidConfig(format!(
                    "Invalid SPI bus {other}, only 0 and 1 are supported"
                )))
            }
        };
        let slave_select = match pins.chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(HalError::InvalidConfig(format!(
                    "Invalid chip select {other}"
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HalError::Spi(e.to_string()))?;

        let gpio = Gpio::new().map_err(|e| HalError::Gpio(e.to_string()))?;
        let mut reset_pin = gpio
            .get(pins.reset)
            .map_err(|e| HalError::Gpio(e.to_string()))?
            .into_output();
        reset_pin.set_high();

        log::info!(
            "Raspberry Pi HAL initialized: SPI{} CE{}, RESET GPIO {}",
            pins.spi_bus,
            pins.chip_select,
            pins.reset
        );

        Ok(Self { spi, reset_pin })
    }
}

impl Hal for RaspberryPiHal {
    fn write_register(&mut self, addr: u8, data: &[u8]) -> Result<(), HalError> {
        let mut tx = Vec::with_capacity(data.len() + 1);
        tx.push(addr | 0x80);
        tx.extend_from_slice(data);
        self.spi
            .write(&tx)
            .map_err(|e| HalError::Spi(format!("Write register 0x{addr:02X} failed: {e}")))?;
        Ok(())
    }

    fn read_register(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), HalError> {
        let mut tx = vec![0u8; buf.len() + 1];
        tx[0] = addr & 0x7F;
        let mut rx = vec![0u8; buf.len() + 1];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HalError::Spi(format!("Read register 0x{addr:02X} failed: {e}")))?;
        buf.copy_from_slice(&rx[1..]);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), HalError> {
        log::debug!("Performing hardware reset of RFM9x");
        // Active low: >100us pulse, then 5ms before the chip accepts SPI
        self.reset_pin.set_low();
        thread::sleep(Duration::from_micros(200));
        self.reset_pin.set_high();
        thread::sleep(Duration::from_millis(5));
        Ok(())
    }
}
