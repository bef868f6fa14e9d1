//! Platform glue for mcpio
//!
//! This crate decides where an MCP23S17 chain lives and opens it. The CLI
//! only interacts with [`ExpanderHandle`] and never with the concrete
//! spidev, GPIO or simulator types.
//!
//! ```text
//!   ExpanderConfig (TOML) ──┐
//!                           ▼
//!   detect() ──► open_expander(config, Backend)
//!                           │
//!          ┌────────────────┴────────────────┐
//!          ▼                                 ▼
//!   device tree check               simulated CS table
//!   spidev + gpiochip               mcpio-sim chain
//!          └────────────────┬────────────────┘
//!                           ▼
//!                    ExpanderHandle
//! ```
//!
//! # Example
//!
//! ```
//! use mcpio_platform::{open_expander, Backend, ExpanderConfig};
//!
//! let config = ExpanderConfig::from_toml_str("sim_devices = [2]")?;
//! let mut handle = open_expander(&config, Backend::Simulated)?;
//! let devices = handle.driver().init()?;
//! assert!(devices.contains(2));
//! # Ok::<(), mcpio_platform::PlatformError>(())
//! ```

pub mod config;
pub mod detect;
pub mod devicetree;
pub mod error;
mod handle;
mod registry;

pub use config::{ExpanderConfig, PinConfig, PinDirection};
pub use detect::{detect, Platform};
pub use devicetree::{ChipSelect, SpiChipSelects};
pub use error::{PlatformError, Result};
pub use handle::{BoxedDelay, BoxedInput, BoxedOutput, BoxedSpi, Expander, ExpanderHandle};
pub use registry::{available_backends, open_expander, open_simulated, Backend, BackendInfo};

pub use mcpio_sim::SimConfig;
