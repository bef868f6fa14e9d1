//! CLI command implementations
//!
//! Commands in `device` run against an opened [`mcpio_platform::Expander`];
//! the ones in `info` only inspect the register map and the platform.

mod device;
mod info;

pub use device::{run_dump, run_loopback, run_read, run_reset, run_scan, run_write};
pub use info::{list_registers, show_platform};
