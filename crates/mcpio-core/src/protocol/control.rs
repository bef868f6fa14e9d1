//! Control byte and register address encoding

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::register::{AddressingMode, Register, MAX_REGISTER_ADDRESS};

/// Fixed opcode in the upper nibble of every control byte
pub const CONTROL_OPCODE: u8 = 0b0100_0000;

/// Number of hardware addresses on one chip-select line
pub const MAX_DEVICES: u8 = 8;

/// Read/write flag in the control byte
const READ_FLAG: u8 = 0b0000_0001;

/// Transfer direction of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Register read (R/W bit set)
    Read,
    /// Register write (R/W bit clear)
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Build the control byte for a device address and direction
///
/// Is of the format `0 1 0 0 A2 A1 A0 R/W`. The address is not masked:
/// anything outside 0..=7 is rejected.
pub fn control_byte(address: u8, direction: Direction) -> Result<u8> {
    if address >= MAX_DEVICES {
        return Err(Error::DeviceAddressOutOfRange(address));
    }
    let rw = match direction {
        Direction::Read => READ_FLAG,
        Direction::Write => 0,
    };
    Ok(CONTROL_OPCODE | (address << 1) | rw)
}

/// Address of a named register in the given addressing mode
pub fn register_address(register: Register, mode: AddressingMode) -> u8 {
    register.address(mode)
}

/// Address of a register given by name
pub fn register_address_by_name(name: &str, mode: AddressingMode) -> Result<u8> {
    Register::from_name(name)
        .map(|reg| reg.address(mode))
        .ok_or(Error::UnknownRegister)
}

/// Validate a raw register address, bypassing the register map
///
/// The address is used verbatim regardless of mode.
pub fn raw_register_address(address: u8, _mode: AddressingMode) -> Result<u8> {
    if address > MAX_REGISTER_ADDRESS {
        return Err(Error::RegisterOutOfRange(address));
    }
    Ok(address)
}

/// Register operand of a transaction: a named register or a raw address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterRef {
    /// Register from the register map, resolved per addressing mode
    Named(Register),
    /// Literal register address (0x00..=0x1A)
    Raw(u8),
}

impl RegisterRef {
    /// Resolve to the on-wire register address
    pub fn resolve(self, mode: AddressingMode) -> Result<u8> {
        match self {
            Self::Named(reg) => Ok(register_address(reg, mode)),
            Self::Raw(addr) => raw_register_address(addr, mode),
        }
    }
}

impl From<Register> for RegisterRef {
    fn from(reg: Register) -> Self {
        Self::Named(reg)
    }
}

impl From<u8> for RegisterRef {
    fn from(addr: u8) -> Self {
        Self::Raw(addr)
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(reg) => write!(f, "{}", reg),
            Self::Raw(addr) => write!(f, "0x{:02X}", addr),
        }
    }
}

impl FromStr for RegisterRef {
    type Err = Error;

    /// Parse a register name (`GPIOA`) or a number (`0x12`, `18`)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(reg) = Register::from_name(s) {
            return Ok(Self::Named(reg));
        }
        let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u8::from_str_radix(hex, 16)
        } else {
            s.parse::<u8>()
        };
        match parsed {
            Ok(addr) if addr <= MAX_REGISTER_ADDRESS => Ok(Self::Raw(addr)),
            Ok(addr) => Err(Error::RegisterOutOfRange(addr)),
            Err(_) => Err(Error::UnknownRegister),
        }
    }
}

/// Build the two byte transaction header
pub fn header(
    address: u8,
    register: RegisterRef,
    direction: Direction,
    mode: AddressingMode,
) -> Result<[u8; 2]> {
    Ok([control_byte(address, direction)?, register.resolve(mode)?])
}
