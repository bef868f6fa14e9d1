//! mcpio-linux-gpio - Linux GPIO lines
//!
//! This crate provides the CE, RESET, INTA and INTB lines of an MCP23S17
//! chain using the Linux character device GPIO interface (gpiocdev).
//!
//! # Overview
//!
//! The implementation uses the gpiocdev crate which provides a pure Rust
//! implementation of the GPIO character device interface, which is the modern
//! way to access GPIO on Linux, replacing the deprecated sysfs interface.
//!
//! # Example
//!
//! ```no_run
//! use mcpio_linux_gpio::{GpioInput, GpioOutput};
//! use mcpio_core::hal::{InputLine, OutputLine};
//!
//! // CE on GPIO 13, idle high
//! let mut ce = GpioOutput::request("/dev/gpiochip0", 13, true)?;
//! ce.write(false)?;
//! assert!(!ce.read()?);
//!
//! let mut int_a = GpioInput::request("gpiochip0", 23)?;
//! println!("INTA: {}", int_a.read()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{chip_path, GpioInput, GpioOutput, CONSUMER};
pub use error::{LinuxGpioError, Result};
