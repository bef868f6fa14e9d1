//! MCP23S17 wire protocol
//!
//! Every SPI transaction starts with a two byte header: the control byte
//! (`0 1 0 0 A2 A1 A0 R/W`) followed by the register address. Data bytes
//! follow the header while CE stays asserted.

mod control;

pub use control::*;
