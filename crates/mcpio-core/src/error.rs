//! Error types for mcpio-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::protocol::Direction;

/// A control line whose electrical state is verified after every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    /// Shared chip-enable line framing each transaction (active low)
    ChipEnable,
    /// Shared RESET line of all chained expanders (active low)
    Reset,
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipEnable => write!(f, "CE"),
            Self::Reset => write!(f, "RESET"),
        }
    }
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Bus and line errors
    /// SPI transfer failed in the underlying bus adapter
    BusTransferFailed,
    /// A GPIO line could not be read or written
    LineIoFailed,
    /// A control line did not read back the level that was just written
    LineVerifyFailed {
        /// The line that failed verification
        line: ControlLine,
        /// The level that was written (`true` = high)
        expected: bool,
    },

    // Encoding errors
    /// Device address outside 0..=7
    DeviceAddressOutOfRange(u8),
    /// Raw register address outside 0x00..=0x1A
    RegisterOutOfRange(u8),
    /// Register name not present in the register map
    UnknownRegister,

    // Session errors
    /// Device address was not found during enumeration
    UnknownDevice(u8),
    /// Transfer attempted in the wrong direction or with no open session
    WrongDirection {
        /// Direction the attempted transfer needs
        required: Direction,
        /// Direction of the open session, `None` if closed
        open: Option<Direction>,
    },

    // Lifecycle errors
    /// Enumeration attempted before the bus was reset
    ResetRequired,
    /// Enumeration attempted while the device set is still valid
    AlreadyEnumerated,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTransferFailed => write!(f, "SPI transfer failed"),
            Self::LineIoFailed => write!(f, "GPIO line access failed"),
            Self::LineVerifyFailed { line, expected } => write!(
                f,
                "{} line did not read back {} after being driven",
                line,
                if *expected { "high" } else { "low" }
            ),
            Self::DeviceAddressOutOfRange(addr) => {
                write!(f, "device address {} out of range (must be 0-7)", addr)
            }
            Self::RegisterOutOfRange(addr) => write!(
                f,
                "register address 0x{:02X} out of range (must be 0x00-0x1A)",
                addr
            ),
            Self::UnknownRegister => write!(f, "unknown register name"),
            Self::UnknownDevice(addr) => {
                write!(f, "no device detected at address {}", addr)
            }
            Self::WrongDirection { required, open } => match open {
                Some(open) => write!(
                    f,
                    "{} transfer attempted on a session opened for {}",
                    required, open
                ),
                None => write!(f, "{} transfer attempted with no open session", required),
            },
            Self::ResetRequired => write!(f, "bus must be reset before enumeration"),
            Self::AlreadyEnumerated => {
                write!(f, "devices already enumerated; reset before re-enumerating")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
