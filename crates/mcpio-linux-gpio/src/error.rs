//! Error types for Linux GPIO line operations

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request a GPIO line
    #[error("Failed to request GPIO line {offset} on {chip}: {source}")]
    LineRequestFailed {
        chip: String,
        offset: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed to get GPIO line value
    #[error("Failed to get GPIO line value: {0}")]
    GetValueFailed(#[source] gpiocdev::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// GPIO chip not specified
    #[error("No GPIO chip specified. Use /dev/gpiochipN, gpiochipN or N")]
    NoDevice,
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
