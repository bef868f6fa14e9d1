//! Error types for the spidev bus

use thiserror::Error;

/// Errors from opening or driving a spidev bus
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// The spidev node could not be opened
    #[error("Failed to open {path}: {source}. Is SPI enabled in the device tree?")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A mode, word size or clock ioctl was rejected
    #[error("Failed to set {setting} to {value} on {device}: {source}")]
    ConfigureFailed {
        device: String,
        setting: &'static str,
        value: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI_IOC_MESSAGE failed
    #[error("Full-duplex transfer of {len} bytes failed: {source}")]
    TransferFailed {
        len: usize,
        #[source]
        source: std::io::Error,
    },

    /// SPI mode outside 0-3
    #[error("SPI mode {0} out of range 0-3")]
    InvalidMode(u8),

    /// Zero clock speed
    #[error("SPI clock speed must be greater than 0 Hz")]
    InvalidSpeed,

    /// Empty device path
    #[error("No spidev device path given")]
    NoDevice,
}

/// Result type for spidev operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
