//! MCP23S17 driver
//!
//! [`Mcp23s17`] ties together the device session, the reset sequencer and
//! the optional INTA/INTB lines, and adds register-level helpers on top of
//! raw transactions.

use crate::devices::DeviceAddressSet;
use crate::enumerate::{enumerate, enumerate_with};
use crate::error::Result;
use crate::hal::{Delay, InputLine, OutputLine, SpiBus};
use crate::protocol::{Direction, RegisterRef};
use crate::register::{AddressingMode, Iocon, Register};
use crate::reset::ResetSequencer;
use crate::session::{DeviceSession, Discovery, Transaction};

/// Placeholder for a driver without interrupt lines
#[derive(Debug)]
pub enum NoLine {}

impl InputLine for NoLine {
    fn read(&mut self) -> Result<bool> {
        match *self {}
    }
}

/// Hardware handed back by [`Mcp23s17::release`]
pub struct Parts<S, C, R, D, I> {
    /// SPI bus
    pub spi: S,
    /// Chip-enable line
    pub ce: C,
    /// RESET line
    pub reset: R,
    /// Delay provider used for reset holds
    pub delay: D,
    /// INTA line, if attached
    pub int_a: Option<I>,
    /// INTB line, if attached
    pub int_b: Option<I>,
}

/// Driver for a chain of MCP23S17 expanders sharing SPI, CE and RESET
pub struct Mcp23s17<S, C, R, D, I = NoLine> {
    session: DeviceSession<S, C>,
    reset: ResetSequencer<R, D>,
    int_a: Option<I>,
    int_b: Option<I>,
}

impl<S, C, R, D> Mcp23s17<S, C, R, D, NoLine>
where
    S: SpiBus,
    C: OutputLine,
    R: OutputLine,
    D: Delay,
{
    /// Create a driver; CE is driven high, nothing is sent on the bus
    ///
    /// Call [`Mcp23s17::init`] (or [`Mcp23s17::reset`] then
    /// [`Mcp23s17::enumerate`]) before accessing registers.
    pub fn new(spi: S, ce: C, reset: R, delay: D, mode: AddressingMode) -> Result<Self> {
        Ok(Self {
            session: DeviceSession::new(spi, ce, mode)?,
            reset: ResetSequencer::new(reset, delay),
            int_a: None,
            int_b: None,
        })
    }

    /// Attach the INTA and INTB lines
    pub fn with_interrupts<I: InputLine>(
        self,
        int_a: I,
        int_b: I,
    ) -> Mcp23s17<S, C, R, D, I> {
        Mcp23s17 {
            session: self.session,
            reset: self.reset,
            int_a: Some(int_a),
            int_b: Some(int_b),
        }
    }
}

impl<S, C, R, D, I> Mcp23s17<S, C, R, D, I>
where
    S: SpiBus,
    C: OutputLine,
    R: OutputLine,
    D: Delay,
    I: InputLine,
{
    /// Addressing mode used for register addresses
    pub fn mode(&self) -> AddressingMode {
        self.session.mode()
    }

    /// Discovery state of the bus
    pub fn discovery(&self) -> Discovery {
        self.session.discovery()
    }

    /// Devices found by the last enumeration
    pub fn devices(&self) -> DeviceAddressSet {
        self.session.devices()
    }

    /// Direct access to the underlying session
    pub fn session(&mut self) -> &mut DeviceSession<S, C> {
        &mut self.session
    }

    /// Pulse RESET, returning every chip to its power-on state
    ///
    /// Any open session is closed first. On success the discovered device
    /// set is cleared and [`Mcp23s17::enumerate`] must run again.
    pub fn reset(&mut self) -> Result<()> {
        self.session.close_device()?;
        self.reset.pulse()?;
        self.session.mark_reset()
    }

    /// Enable hardware addressing and find the devices on the bus
    pub fn enumerate(&mut self) -> Result<DeviceAddressSet> {
        enumerate(&mut self.session)
    }

    /// Like [`Mcp23s17::enumerate`], also writing `extra` IOCON bits
    pub fn enumerate_with(&mut self, extra: Iocon) -> Result<DeviceAddressSet> {
        enumerate_with(&mut self.session, extra)
    }

    /// Reset the bus and enumerate devices
    pub fn init(&mut self) -> Result<DeviceAddressSet> {
        self.reset()?;
        self.enumerate()
    }

    /// Open a device and return a guard that closes it when dropped
    pub fn transaction(
        &mut self,
        address: u8,
        register: impl Into<RegisterRef>,
        direction: Direction,
    ) -> Result<Transaction<'_, S, C>> {
        self.session.transaction(address, register, direction)
    }

    /// Read one register
    pub fn read_register(&mut self, address: u8, register: impl Into<RegisterRef>) -> Result<u8> {
        let mut tx = self.transaction(address, register, Direction::Read)?;
        let value = tx.read_byte()?;
        tx.finish()?;
        Ok(value)
    }

    /// Write one register
    pub fn write_register(
        &mut self,
        address: u8,
        register: impl Into<RegisterRef>,
        value: u8,
    ) -> Result<()> {
        let mut tx = self.transaction(address, register, Direction::Write)?;
        tx.write_all(&[value])?;
        tx.finish()
    }

    /// Sequential read starting at `start`
    ///
    /// Relies on the chip's address pointer auto-increment (IOCON.SEQOP
    /// clear, the power-on default). The increment order follows the
    /// active addressing mode.
    pub fn read_registers(
        &mut self,
        address: u8,
        start: impl Into<RegisterRef>,
        buf: &mut [u8],
    ) -> Result<()> {
        let mut tx = self.transaction(address, start, Direction::Read)?;
        tx.read(buf)?;
        tx.finish()
    }

    /// Sequential write starting at `start`, see [`Mcp23s17::read_registers`]
    pub fn write_registers(
        &mut self,
        address: u8,
        start: impl Into<RegisterRef>,
        data: &[u8],
    ) -> Result<()> {
        let mut tx = self.transaction(address, start, Direction::Write)?;
        tx.write_all(data)?;
        tx.finish()
    }

    /// Read both ports, port A in the low byte
    pub fn read_port16(&mut self, address: u8) -> Result<u16> {
        let a = self.read_register(address, Register::GPIOA)?;
        let b = self.read_register(address, Register::GPIOB)?;
        Ok(u16::from_le_bytes([a, b]))
    }

    /// Write both ports, port A from the low byte
    pub fn write_port16(&mut self, address: u8, value: u16) -> Result<()> {
        let [a, b] = value.to_le_bytes();
        self.write_register(address, Register::GPIOA, a)?;
        self.write_register(address, Register::GPIOB, b)
    }

    /// Level of the INTA line, `None` when not attached
    pub fn interrupt_a(&mut self) -> Result<Option<bool>> {
        self.int_a.as_mut().map(|line| line.read()).transpose()
    }

    /// Level of the INTB line, `None` when not attached
    pub fn interrupt_b(&mut self) -> Result<Option<bool>> {
        self.int_b.as_mut().map(|line| line.read()).transpose()
    }

    /// Clock `buf` through the bus with CE high
    ///
    /// No expander drives MISO in this state, so with MOSI wired to MISO
    /// the bytes come back unchanged.
    pub fn loopback(&mut self, buf: &mut [u8]) -> Result<()> {
        self.session.unframed_transfer(buf)
    }

    /// Check a MOSI/MISO loopback using a fixed test pattern
    pub fn loopback_check(&mut self) -> Result<bool> {
        const PATTERN: [u8; 4] = [0x55, 0xAA, 0xFF, 0x00];
        let mut buf = PATTERN;
        self.loopback(&mut buf)?;
        if buf != PATTERN {
            log::warn!(
                "mcp23s17: loopback mismatch: sent {:02X?}, got {:02X?}",
                PATTERN,
                buf
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Give back the hardware; an open session is closed first
    pub fn release(self) -> Result<Parts<S, C, R, D, I>> {
        let (spi, ce) = self.session.release()?;
        let (reset, delay) = self.reset.release();
        Ok(Parts {
            spi,
            ce,
            reset,
            delay,
            int_a: self.int_a,
            int_b: self.int_b,
        })
    }
}
