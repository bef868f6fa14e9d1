//! Error types for platform setup

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while detecting the platform, reading configuration or
/// opening a backend
#[derive(Debug, Error)]
pub enum PlatformError {
    /// `/proc/device-tree/soc` does not exist
    #[error("Device tree not found at {}. Are you running on a Raspberry Pi?", .0.display())]
    DeviceTreeMissing(PathBuf),

    /// A device-tree node or property could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    DeviceTreeRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured SPI bus has no device-tree node
    #[error("SPI bus {0} not found in device tree")]
    BusNotFound(String),

    /// The configured SPI bus has no GPIO chip select
    #[error("No CS GPIO found for {0}. Check device tree configuration")]
    NoChipSelect(String),

    /// The device tree assigns a different GPIO as chip select
    #[error(
        "CS GPIO {found} from device tree does not match configured CE GPIO {configured} on {bus}"
    )]
    ChipSelectMismatch {
        bus: String,
        found: u32,
        configured: u32,
    },

    /// Configuration file could not be read
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML or has wrong value types
    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration value out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend name not recognized
    #[error("Unknown backend '{0}' (expected auto, hardware or simulated)")]
    UnknownBackend(String),

    /// Hardware backend requested but not compiled in
    #[error("Hardware backend requires the '{0}' feature")]
    BackendUnavailable(&'static str),

    /// Linux spidev error
    #[cfg(feature = "linux-spi")]
    #[error(transparent)]
    Spi(#[from] mcpio_linux_spi::LinuxSpiError),

    /// Linux GPIO error
    #[cfg(feature = "linux-gpio")]
    #[error(transparent)]
    Gpio(#[from] mcpio_linux_gpio::LinuxGpioError),

    /// Driver error while bringing up the expanders
    #[error(transparent)]
    Device(#[from] mcpio_core::Error),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
