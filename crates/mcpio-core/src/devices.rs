//! Set of device addresses found on the bus

use core::fmt;

use crate::error::{Error, Result};
use crate::protocol::MAX_DEVICES;

/// Ordered set of hardware addresses (0..=7) confirmed present
///
/// Stored as a bitmask, bit N set means address N is present.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddressSet(u8);

impl DeviceAddressSet {
    /// An empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from a bitmask (bit N = address N)
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Build a set from a list of addresses
    pub fn from_addresses(addresses: &[u8]) -> Result<Self> {
        let mut set = Self::empty();
        for &addr in addresses {
            set.insert(addr)?;
        }
        Ok(set)
    }

    /// The underlying bitmask
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Add an address to the set
    pub fn insert(&mut self, address: u8) -> Result<()> {
        if address >= MAX_DEVICES {
            return Err(Error::DeviceAddressOutOfRange(address));
        }
        self.0 |= 1 << address;
        Ok(())
    }

    /// Whether `address` is in the set
    pub fn contains(self, address: u8) -> bool {
        address < MAX_DEVICES && self.0 & (1 << address) != 0
    }

    /// Number of addresses in the set
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Addresses in ascending order
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..MAX_DEVICES).filter(move |addr| self.contains(*addr))
    }
}

impl fmt::Debug for DeviceAddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for DeviceAddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, addr) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", addr)?;
        }
        write!(f, "}}")
    }
}
