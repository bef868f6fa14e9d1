//! Register map of the MCP23S17
//!
//! This module describes the 21 registers, their addresses in both
//! addressing modes, and the meaning of every bit.

mod map;

pub use map::{
    BitNames, Register, RegisterDescriptor, IOCON_ALIAS_BANK0, IOCON_ALIAS_BANK1,
    MAX_REGISTER_ADDRESS, REGISTERS,
};

use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// IOCON configuration register bits
    ///
    /// Bit 0 is unimplemented and always reads as 0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Iocon: u8 {
        /// Register addressing: 0 = interleaved (BANK0), 1 = split (BANK1)
        const BANK   = 1 << 7;
        /// INTA and INTB are internally connected
        const MIRROR = 1 << 6;
        /// Sequential operation disabled (address pointer does not increment)
        const SEQOP  = 1 << 5;
        /// Slew rate control disabled (I2C variant only)
        const DISSLW = 1 << 4;
        /// Hardware address pins enabled
        const HAEN   = 1 << 3;
        /// INT pins are open-drain
        const ODR    = 1 << 2;
        /// INT pins are active-high
        const INTPOL = 1 << 1;
    }
}

impl Default for Iocon {
    fn default() -> Self {
        Iocon::empty()
    }
}

/// Register addressing mode, selected by `IOCON.BANK`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressingMode {
    /// Port A and B registers interleaved (power-on default)
    #[default]
    Bank0,
    /// Port A registers at 0x00-0x0A, port B registers at 0x10-0x1A
    Bank1,
}

impl AddressingMode {
    /// IOCON bits that select this mode
    pub fn iocon(self) -> Iocon {
        match self {
            Self::Bank0 => Iocon::empty(),
            Self::Bank1 => Iocon::BANK,
        }
    }

    /// Addressing mode selected by an IOCON value
    pub fn from_iocon(iocon: Iocon) -> Self {
        if iocon.contains(Iocon::BANK) {
            Self::Bank1
        } else {
            Self::Bank0
        }
    }
}

impl TryFrom<u8> for AddressingMode {
    type Error = u8;

    fn try_from(bank: u8) -> core::result::Result<Self, u8> {
        match bank {
            0 => Ok(Self::Bank0),
            1 => Ok(Self::Bank1),
            other => Err(other),
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bank0 => write!(f, "BANK0"),
            Self::Bank1 => write!(f, "BANK1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iocon_matches_bit_names() {
        let desc = Register::IOCON.descriptor();
        assert_eq!(Iocon::HAEN.bits(), desc.bit_value(&["HAEN"]));
        assert_eq!(Iocon::BANK.bits(), desc.bit_value(&["BANK"]));
        assert_eq!(Iocon::SEQOP.bits(), desc.bit_value(&["SEQOP"]));
        assert_eq!(Iocon::all().bits(), 0xFE);
    }

    #[test]
    fn test_addressing_mode_conversions() {
        assert_eq!(AddressingMode::try_from(0), Ok(AddressingMode::Bank0));
        assert_eq!(AddressingMode::try_from(1), Ok(AddressingMode::Bank1));
        assert_eq!(AddressingMode::try_from(2), Err(2));
        assert_eq!(
            AddressingMode::from_iocon(Iocon::BANK | Iocon::HAEN),
            AddressingMode::Bank1
        );
        assert_eq!(AddressingMode::Bank0.iocon(), Iocon::empty());
    }
}
