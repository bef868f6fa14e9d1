//! mcpio-linux-spi - Linux spidev support
//!
//! This crate provides the SPI bus for MCP23S17 expanders on Linux via the
//! `/dev/spidevX.Y` device interface.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! The expanders are framed by a GPIO chip-enable line, so only the bus
//! number matters and chip select 0 is opened.
//!
//! # Example
//!
//! ```no_run
//! use mcpio_linux_spi::{LinuxSpi, LinuxSpiConfig};
//! use mcpio_core::hal::SpiBus;
//!
//! let config = LinuxSpiConfig::for_bus(1)
//!     .with_speed(4_000_000)  // 4 MHz
//!     .with_mode(0);
//! let mut spi = LinuxSpi::open(&config)?;
//!
//! let mut buf = [0x55, 0xAA];
//! spi.transfer(&mut buf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{LinuxSpi, LinuxSpiConfig, DEFAULT_SPEED_HZ, MAX_MODE, MAX_SPEED_HZ};
pub use error::{LinuxSpiError, Result};
