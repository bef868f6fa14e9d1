//! mcpio-core - MCP23S17 SPI I/O expander protocol layer
//!
//! This crate implements everything needed to talk to a chain of up to
//! eight MCP23S17 expanders sharing one SPI bus, one chip-enable (CE) line
//! and one RESET line. It is `no_std` compatible; the bus, lines and delay
//! are supplied through the traits in [`hal`].
//!
//! # Features
//!
//! - `std` - Enable standard library support (`SharedExpander`, `StdDelay`,
//!   `std::error::Error` for [`Error`])
//!
//! # Example
//!
//! ```ignore
//! use mcpio_core::{AddressingMode, Mcp23s17, Register};
//!
//! fn blink<S, C, R, D>(spi: S, ce: C, reset: R, delay: D) -> mcpio_core::Result<()>
//! where
//!     S: mcpio_core::hal::SpiBus,
//!     C: mcpio_core::hal::OutputLine,
//!     R: mcpio_core::hal::OutputLine,
//!     D: mcpio_core::hal::Delay,
//! {
//!     let mut dev = Mcp23s17::new(spi, ce, reset, delay, AddressingMode::Bank0)?;
//!     for address in dev.init()?.iter() {
//!         dev.write_register(address, Register::IODIRA, 0x00)?;
//!         dev.write_register(address, Register::GPIOA, 0xFF)?;
//!     }
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod device;
pub mod devices;
pub mod enumerate;
pub mod error;
pub mod hal;
pub mod protocol;
pub mod register;
pub mod reset;
pub mod session;
#[cfg(feature = "std")]
pub mod shared;

#[cfg(test)]
mod mock;

pub use device::{Mcp23s17, NoLine, Parts};
pub use devices::DeviceAddressSet;
pub use error::{ControlLine, Error, Result};
pub use protocol::{control_byte, header, register_address, Direction, RegisterRef};
pub use register::{AddressingMode, Iocon, Register, RegisterDescriptor};
pub use session::{DeviceSession, Discovery, SessionState, Transaction};
#[cfg(feature = "std")]
pub use shared::SharedExpander;
