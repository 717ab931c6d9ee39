//! # RFM9x (SX127x) Register Definitions
//!
//! Register addresses, operating modes and IRQ bits used by the LoRa-mode
//! driver. Addresses are from the SX1276/77/78/79 datasheet, LoRa register map.

// =============================================================================
// Register Addresses
// =============================================================================

/// FIFO read/write access
pub const REG_FIFO: u8 = 0x00;

/// Operating mode and LoRa/FSK selection
pub const REG_OP_MODE: u8 = 0x01;

/// RF carrier frequency (MSB, MID, LSB)
pub const REG_FRF_MSB: u8 = 0x06;
pub const REG_FRF_MID: u8 = 0x07;
pub const REG_FRF_LSB: u8 = 0x08;

/// PA selection and output power
pub const REG_PA_CONFIG: u8 = 0x09;

/// LNA gain settings
pub const REG_LNA: u8 = 0x0C;

/// FIFO SPI pointer
pub const REG_FIFO_ADDR_PTR: u8 = 0x0D;

/// Start of TX data in the FIFO
pub const REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;

/// Start of RX data in the FIFO
pub const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;

/// Start address of the last packet received
pub const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;

/// IRQ flags (write 1 to clear)
pub const REG_IRQ_FLAGS: u8 = 0x12;

/// Number of payload bytes of the last packet
pub const REG_RX_NB_BYTES: u8 = 0x13;

/// SNR of the last packet (two's complement, quarter dB)
pub const REG_PKT_SNR_VALUE: u8 = 0x19;

/// RSSI of the last packet
pub const REG_PKT_RSSI_VALUE: u8 = 0x1A;

/// Bandwidth, coding rate, header mode
pub const REG_MODEM_CONFIG_1: u8 = 0x1D;

/// Spreading factor, RX payload CRC
pub const REG_MODEM_CONFIG_2: u8 = 0x1E;

/// Preamble length (MSB, LSB)
pub const REG_PREAMBLE_MSB: u8 = 0x20;
pub const REG_PREAMBLE_LSB: u8 = 0x21;

/// Payload length in explicit-header TX
pub const REG_PAYLOAD_LENGTH: u8 = 0x22;

/// Low data rate optimize, AGC
pub const REG_MODEM_CONFIG_3: u8 = 0x26;

/// LoRa detection optimize (SF6 needs 0x05)
pub const REG_DETECTION_OPTIMIZE: u8 = 0x31;

/// LoRa detection threshold (SF6 needs 0x0C)
pub const REG_DETECTION_THRESHOLD: u8 = 0x37;

/// DIO0..DIO3 mapping
pub const REG_DIO_MAPPING_1: u8 = 0x40;

/// Silicon revision
pub const REG_VERSION: u8 = 0x42;

/// High power PA settings (+20 dBm)
pub const REG_PA_DAC: u8 = 0x4D;

// =============================================================================
// Operating Modes
// =============================================================================

/// LoRa mode bit in REG_OP_MODE
pub const MODE_LONG_RANGE: u8 = 0x80;
pub const MODE_SLEEP: u8 = 0x00;
pub const MODE_STDBY: u8 = 0x01;
pub const MODE_TX: u8 = 0x03;
pub const MODE_RX_CONTINUOUS: u8 = 0x05;

// =============================================================================
// IRQ Flags
// =============================================================================

pub const IRQ_TX_DONE: u8 = 0x08;
pub const IRQ_VALID_HEADER: u8 = 0x10;
pub const IRQ_PAYLOAD_CRC_ERROR: u8 = 0x20;
pub const IRQ_RX_DONE: u8 = 0x40;

/// Clears every IRQ flag
pub const IRQ_ALL: u8 = 0xFF;

// =============================================================================
// Misc
// =============================================================================

/// Expected REG_VERSION value for SX1276/77/78/79
pub const CHIP_VERSION: u8 = 0x12;

/// Crystal oscillator frequency in Hz
pub const FXOSC_HZ: u64 = 32_000_000;

/// Largest payload the driver will transmit (FIFO minus a 4-byte header)
pub const MAX_PAYLOAD_LEN: usize = 252;

/// PA_DAC values: default and +20 dBm mode
pub const PA_DAC_DEFAULT: u8 = 0x84;
pub const PA_DAC_HIGH_POWER: u8 = 0x87;

/// Supported bandwidth steps in Hz, indexed by their MODEM_CONFIG_1 code
pub const BANDWIDTH_STEPS_HZ: [u32; 10] = [
    7_800, 10_400, 15_600, 20_800, 31_250, 41_700, 62_500, 125_000, 250_000, 500_000,
];
