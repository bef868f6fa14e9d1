//! MCP23S17 register table
//!
//! Every register has two addresses: one for `IOCON.BANK = 0` (ports
//! interleaved, the power-on layout) and one for `IOCON.BANK = 1` (ports
//! split into two contiguous blocks).

use core::fmt;
use core::str::FromStr;

use super::AddressingMode;
use crate::error::Error;

/// Bit names of one register, most significant bit first
pub type BitNames = [Option<&'static str>; 8];

/// Immutable description of a single register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    /// Datasheet name (e.g. "GPIOA")
    pub name: &'static str,
    /// Address with `IOCON.BANK = 0`
    pub bank0: u8,
    /// Address with `IOCON.BANK = 1`
    pub bank1: u8,
    /// Bit names, index 0 is bit 7. `None` marks an unimplemented bit.
    pub bits: BitNames,
    /// Short description
    pub description: &'static str,
}

impl RegisterDescriptor {
    /// Address of this register in the given addressing mode
    pub const fn address(&self, mode: AddressingMode) -> u8 {
        match mode {
            AddressingMode::Bank0 => self.bank0,
            AddressingMode::Bank1 => self.bank1,
        }
    }

    /// Bit position (7 = MSB) of a named bit
    pub fn bit_position(&self, name: &str) -> Option<u8> {
        self.bits
            .iter()
            .position(|bit| *bit == Some(name))
            .map(|index| 7 - index as u8)
    }

    /// Build a register value with exactly the named bits set
    ///
    /// Names that are not bits of this register are ignored.
    pub fn bit_value(&self, names: &[&str]) -> u8 {
        names
            .iter()
            .filter_map(|name| self.bit_position(name))
            .fold(0, |value, pos| value | (1 << pos))
    }

    /// Names of the bits set in `value`, most significant first
    pub fn set_bits(&self, value: u8) -> impl Iterator<Item = &'static str> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(move |(index, _)| value & (0x80 >> index) != 0)
            .filter_map(|(_, bit)| *bit)
    }

    /// Number of implemented bits
    pub fn width(&self) -> usize {
        self.bits.iter().filter(|bit| bit.is_some()).count()
    }
}

/// Highest address any register occupies in either mode
pub const MAX_REGISTER_ADDRESS: u8 = 0x1A;

/// Second IOCON address in BANK0 (same register as 0x0A)
pub const IOCON_ALIAS_BANK0: u8 = 0x0B;

/// Second IOCON address in BANK1 (same register as 0x05)
pub const IOCON_ALIAS_BANK1: u8 = 0x15;

const IO: BitNames = bits(["IO7", "IO6", "IO5", "IO4", "IO3", "IO2", "IO1", "IO0"]);
const IP: BitNames = bits(["IP7", "IP6", "IP5", "IP4", "IP3", "IP2", "IP1", "IP0"]);
const GPINT: BitNames = bits([
    "GPINT7", "GPINT6", "GPINT5", "GPINT4", "GPINT3", "GPINT2", "GPINT1", "GPINT0",
]);
const DEF: BitNames = bits(["DEF7", "DEF6", "DEF5", "DEF4", "DEF3", "DEF2", "DEF1", "DEF0"]);
const IOC: BitNames = bits(["IOC7", "IOC6", "IOC5", "IOC4", "IOC3", "IOC2", "IOC1", "IOC0"]);
const PU: BitNames = bits(["PU7", "PU6", "PU5", "PU4", "PU3", "PU2", "PU1", "PU0"]);
const INT: BitNames = bits(["INT7", "INT6", "INT5", "INT4", "INT3", "INT2", "INT1", "INT0"]);
const ICP: BitNames = bits(["ICP7", "ICP6", "ICP5", "ICP4", "ICP3", "ICP2", "ICP1", "ICP0"]);
const GP: BitNames = bits(["GP7", "GP6", "GP5", "GP4", "GP3", "GP2", "GP1", "GP0"]);
const OL: BitNames = bits(["OL7", "OL6", "OL5", "OL4", "OL3", "OL2", "OL1", "OL0"]);
const IOCON_BITS: BitNames = [
    Some("BANK"),
    Some("MIRROR"),
    Some("SEQOP"),
    Some("DISSLW"),
    Some("HAEN"),
    Some("ODR"),
    Some("INTPOL"),
    None,
];

const fn bits(names: [&'static str; 8]) -> BitNames {
    [
        Some(names[0]),
        Some(names[1]),
        Some(names[2]),
        Some(names[3]),
        Some(names[4]),
        Some(names[5]),
        Some(names[6]),
        Some(names[7]),
    ]
}

const fn reg(
    name: &'static str,
    bank0: u8,
    bank1: u8,
    bits: BitNames,
    description: &'static str,
) -> RegisterDescriptor {
    RegisterDescriptor {
        name,
        bank0,
        bank1,
        bits,
        description,
    }
}

/// All registers, in BANK0 address order (indexed by `Register as usize`)
pub static REGISTERS: [RegisterDescriptor; 21] = [
    reg("IODIRA", 0x00, 0x00, IO, "I/O direction A"),
    reg("IODIRB", 0x01, 0x10, IO, "I/O direction B"),
    reg("IPOLA", 0x02, 0x01, IP, "Input polarity A"),
    reg("IPOLB", 0x03, 0x11, IP, "Input polarity B"),
    reg("GPINTENA", 0x04, 0x02, GPINT, "Interrupt-on-change enable A"),
    reg("GPINTENB", 0x05, 0x12, GPINT, "Interrupt-on-change enable B"),
    reg("DEFVALA", 0x06, 0x03, DEF, "Default compare value A"),
    reg("DEFVALB", 0x07, 0x13, DEF, "Default compare value B"),
    reg("INTCONA", 0x08, 0x04, IOC, "Interrupt control A"),
    reg("INTCONB", 0x09, 0x14, IOC, "Interrupt control B"),
    reg("IOCON", 0x0A, 0x05, IOCON_BITS, "Configuration"),
    reg("GPPUA", 0x0C, 0x06, PU, "Pull-up enable A"),
    reg("GPPUB", 0x0D, 0x16, PU, "Pull-up enable B"),
    reg("INTFA", 0x0E, 0x07, INT, "Interrupt flag A"),
    reg("INTFB", 0x0F, 0x17, INT, "Interrupt flag B"),
    reg("INTCAPA", 0x10, 0x08, ICP, "Interrupt captured value A"),
    reg("INTCAPB", 0x11, 0x18, ICP, "Interrupt captured value B"),
    reg("GPIOA", 0x12, 0x09, GP, "Port A"),
    reg("GPIOB", 0x13, 0x19, GP, "Port B"),
    reg("OLATA", 0x14, 0x0A, OL, "Output latch A"),
    reg("OLATB", 0x15, 0x1A, OL, "Output latch B"),
];

/// MCP23S17 registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    IODIRA,
    IODIRB,
    IPOLA,
    IPOLB,
    GPINTENA,
    GPINTENB,
    DEFVALA,
    DEFVALB,
    INTCONA,
    INTCONB,
    IOCON,
    GPPUA,
    GPPUB,
    INTFA,
    INTFB,
    INTCAPA,
    INTCAPB,
    GPIOA,
    GPIOB,
    OLATA,
    OLATB,
}

impl Register {
    /// Every register, in BANK0 address order
    pub const ALL: [Register; 21] = [
        Self::IODIRA,
        Self::IODIRB,
        Self::IPOLA,
        Self::IPOLB,
        Self::GPINTENA,
        Self::GPINTENB,
        Self::DEFVALA,
        Self::DEFVALB,
        Self::INTCONA,
        Self::INTCONB,
        Self::IOCON,
        Self::GPPUA,
        Self::GPPUB,
        Self::INTFA,
        Self::INTFB,
        Self::INTCAPA,
        Self::INTCAPB,
        Self::GPIOA,
        Self::GPIOB,
        Self::OLATA,
        Self::OLATB,
    ];

    /// Static descriptor of this register
    pub fn descriptor(self) -> &'static RegisterDescriptor {
        &REGISTERS[self as usize]
    }

    /// Datasheet name
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Address in the given addressing mode
    pub fn address(self, mode: AddressingMode) -> u8 {
        self.descriptor().address(mode)
    }

    /// Look up a register by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|reg| reg.name().eq_ignore_ascii_case(name))
    }

    /// Look up the register mapped at `address` in the given mode
    ///
    /// The second IOCON address of each mode resolves to `IOCON`.
    pub fn from_address(address: u8, mode: AddressingMode) -> Option<Self> {
        let alias = match mode {
            AddressingMode::Bank0 => IOCON_ALIAS_BANK0,
            AddressingMode::Bank1 => IOCON_ALIAS_BANK1,
        };
        if address == alias {
            return Some(Self::IOCON);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|reg| reg.address(mode) == address)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim()).ok_or(Error::UnknownRegister)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for reg in Register::ALL {
            assert_eq!(REGISTERS[reg as usize].name, reg.name());
        }
    }

    #[test]
    fn test_addresses_unique_per_bank() {
        for mode in [AddressingMode::Bank0, AddressingMode::Bank1] {
            for (i, a) in REGISTERS.iter().enumerate() {
                for b in &REGISTERS[i + 1..] {
                    assert_ne!(a.address(mode), b.address(mode), "{} vs {}", a.name, b.name);
                }
                assert!(a.address(mode) <= MAX_REGISTER_ADDRESS);
            }
        }
    }

    #[test]
    fn test_bank_addresses() {
        assert_eq!(Register::IODIRA.address(AddressingMode::Bank0), 0x00);
        assert_eq!(Register::IODIRA.address(AddressingMode::Bank1), 0x00);
        assert_eq!(Register::GPIOA.address(AddressingMode::Bank0), 0x12);
        assert_eq!(Register::GPIOA.address(AddressingMode::Bank1), 0x09);
        assert_eq!(Register::IOCON.address(AddressingMode::Bank0), 0x0A);
        assert_eq!(Register::IOCON.address(AddressingMode::Bank1), 0x05);
        assert_eq!(Register::OLATB.address(AddressingMode::Bank1), 0x1A);

        // Only IODIRA shares its address across both modes
        let same: usize = REGISTERS.iter().filter(|r| r.bank0 == r.bank1).count();
        assert_eq!(same, 1);
    }

    #[test]
    fn test_bit_value_msb_first() {
        let iocon = Register::IOCON.descriptor();
        assert_eq!(iocon.bit_value(&["HAEN"]), 0x08);
        assert_eq!(iocon.bit_value(&["BANK", "INTPOL"]), 0x82);
        assert_eq!(iocon.bit_value(&[]), 0x00);

        let gpio = Register::GPIOB.descriptor();
        assert_eq!(gpio.bit_value(&["GP0", "GP2"]), 0b0000_0101);
        assert_eq!(gpio.bit_value(&["GP7"]), 0x80);
    }

    #[test]
    fn test_bit_value_ignores_unknown_names() {
        let iocon = Register::IOCON.descriptor();
        assert_eq!(iocon.bit_value(&["HAEN", "NOPE", "GP0"]), 0x08);
    }

    #[test]
    fn test_set_bits_and_width() {
        let iocon = Register::IOCON.descriptor();
        let names: [&str; 2] = ["SEQOP", "HAEN"];
        assert!(iocon.set_bits(0x28).eq(names.iter().copied()));
        // Bit 0 is unimplemented and never named
        assert_eq!(iocon.set_bits(0x01).count(), 0);
        assert_eq!(iocon.width(), 7);
        assert_eq!(Register::GPIOA.descriptor().width(), 8);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Register::from_name("gpioa"), Some(Register::GPIOA));
        assert_eq!("IOCON".parse::<Register>(), Ok(Register::IOCON));
        assert_eq!("FOO".parse::<Register>(), Err(Error::UnknownRegister));

        assert_eq!(
            Register::from_address(0x0B, AddressingMode::Bank0),
            Some(Register::IOCON)
        );
        assert_eq!(
            Register::from_address(0x15, AddressingMode::Bank1),
            Some(Register::IOCON)
        );
        assert_eq!(
            Register::from_address(0x19, AddressingMode::Bank1),
            Some(Register::GPIOB)
        );
        assert_eq!(Register::from_address(0x0C, AddressingMode::Bank1), None);
    }
}
