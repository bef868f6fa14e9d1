//! Hardware abstraction traits
//!
//! This module defines the traits that platform adapters implement to give
//! the protocol layer access to the SPI bus, the control lines and a
//! blocking delay.

mod traits;

pub use traits::*;
