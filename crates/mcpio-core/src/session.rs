//! Device session state machine
//!
//! All MCP23S17 devices on a bus share the SPI lines and a single chip-enable
//! (CE) line. A transaction is framed by CE: it is driven low, the two byte
//! header selects device and register, data bytes follow, and CE is driven
//! high again. [`DeviceSession`] is the only owner of the bus and CE, and
//! allows a single open device at a time:
//!
//! ```text
//!            open_device()                     close_device()
//!   Closed ───────────────▶ Open(addr, dir) ─────────────────▶ Closed
//!   CE high                 CE low                             CE high
//!                             │  ▲
//!                             └──┘ open_device(): closes first
//! ```
//!
//! Every CE write is read back; a line that does not follow is reported as
//! [`Error::LineVerifyFailed`].

use crate::devices::DeviceAddressSet;
use crate::error::{ControlLine, Error, Result};
use crate::hal::{OutputLine, SpiBus};
use crate::protocol::{header, Direction, RegisterRef};
use crate::register::AddressingMode;

/// Size of the stack buffer used to stream caller data onto the bus
const CHUNK_SIZE: usize = 32;

/// Current state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device open, CE high
    Closed,
    /// A device is open, CE low and header already sent
    Open {
        /// Hardware address of the open device
        address: u8,
        /// Direction the session was opened for
        direction: Direction,
    },
}

/// What is known about the devices on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// No reset since the session was created; chip state is undefined
    Unreset,
    /// Bus was reset, devices not enumerated yet
    Reset,
    /// Devices enumerated since the last reset
    Enumerated(DeviceAddressSet),
}

/// Exclusive owner of the SPI bus and the CE line
pub struct DeviceSession<S, C> {
    spi: S,
    ce: C,
    mode: AddressingMode,
    state: SessionState,
    discovery: Discovery,
}

impl<S: SpiBus, C: OutputLine> DeviceSession<S, C> {
    /// Take ownership of the bus and CE line
    ///
    /// CE is driven high (and verified) so the session starts closed.
    pub fn new(spi: S, ce: C, mode: AddressingMode) -> Result<Self> {
        let mut session = Self {
            spi,
            ce,
            mode,
            state: SessionState::Closed,
            discovery: Discovery::Unreset,
        };
        session.drive_ce(true)?;
        Ok(session)
    }

    /// Addressing mode used to resolve register names
    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a device is currently open
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// Discovery state of the bus
    pub fn discovery(&self) -> Discovery {
        self.discovery
    }

    /// Devices found by the last enumeration (empty if none ran since reset)
    pub fn devices(&self) -> DeviceAddressSet {
        match self.discovery {
            Discovery::Enumerated(set) => set,
            _ => DeviceAddressSet::empty(),
        }
    }

    /// Open a discovered device for a register access
    ///
    /// Any open session is closed first. Fails with
    /// [`Error::UnknownDevice`] if `address` was not found by enumeration.
    pub fn open_device(
        &mut self,
        address: u8,
        register: impl Into<RegisterRef>,
        direction: Direction,
    ) -> Result<()> {
        self.close_device()?;
        if !self.devices().contains(address) {
            return Err(Error::UnknownDevice(address));
        }
        self.open_unchecked(address, register.into(), direction)
    }

    /// Open any address, bypassing the discovered device set
    ///
    /// Used by enumeration, before any address is known.
    pub(crate) fn open_unchecked(
        &mut self,
        address: u8,
        register: RegisterRef,
        direction: Direction,
    ) -> Result<()> {
        self.close_device()?;
        let mut hdr = header(address, register, direction, self.mode)?;

        if let Err(e) = self.drive_ce(false) {
            // CE may already be low; release it so the bus is not left selected
            if self.ce.write(true).is_err() {
                log::error!("mcp23s17: failed to release CE after open error");
            }
            return Err(e);
        }
        self.state = SessionState::Open { address, direction };
        log::trace!(
            "mcp23s17: open addr={} {} reg={} header={:02X} {:02X}",
            address,
            direction,
            register,
            hdr[0],
            hdr[1]
        );
        if let Err(e) = self.spi.transfer(&mut hdr) {
            if let Err(close) = self.close_device() {
                log::error!("mcp23s17: close after failed header transfer: {}", close);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Close the open device, if any
    ///
    /// Does nothing when already closed.
    pub fn close_device(&mut self) -> Result<()> {
        if let SessionState::Open { address, .. } = self.state {
            self.drive_ce(true)?;
            self.state = SessionState::Closed;
            log::trace!("mcp23s17: close addr={}", address);
        }
        Ok(())
    }

    /// Full-duplex data transfer on a session opened for writing
    ///
    /// `buf` is sent and replaced with the bytes clocked back.
    pub fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.require(Direction::Write)?;
        self.spi.transfer(buf)
    }

    /// Read `buf.len()` bytes on a session opened for reading
    ///
    /// Zero bytes are clocked out.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.require(Direction::Read)?;
        buf.fill(0);
        self.spi.transfer(buf)
    }

    /// Write `data` on a session opened for writing, discarding the response
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.require(Direction::Write)?;
        let mut chunk = [0u8; CHUNK_SIZE];
        for part in data.chunks(CHUNK_SIZE) {
            let buf = &mut chunk[..part.len()];
            buf.copy_from_slice(part);
            self.spi.transfer(buf)?;
        }
        Ok(())
    }

    /// Open a device and return a guard that closes it when dropped
    pub fn transaction(
        &mut self,
        address: u8,
        register: impl Into<RegisterRef>,
        direction: Direction,
    ) -> Result<Transaction<'_, S, C>> {
        self.open_device(address, register, direction)?;
        Ok(Transaction {
            session: self,
            done: false,
        })
    }

    /// Transfer with no device selected (CE high), e.g. for a loopback check
    ///
    /// Any open session is closed first.
    pub fn unframed_transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.close_device()?;
        self.spi.transfer(buf)
    }

    /// Forget discovered devices after the bus was reset
    pub(crate) fn mark_reset(&mut self) -> Result<()> {
        self.close_device()?;
        self.discovery = Discovery::Reset;
        Ok(())
    }

    /// Record the result of an enumeration
    pub(crate) fn set_devices(&mut self, devices: DeviceAddressSet) {
        self.discovery = Discovery::Enumerated(devices);
    }

    /// Give back the bus and CE line
    ///
    /// An open session is closed first.
    pub fn release(mut self) -> Result<(S, C)> {
        self.close_device()?;
        Ok((self.spi, self.ce))
    }

    fn require(&self, required: Direction) -> Result<()> {
        match self.state {
            SessionState::Open { direction, .. } if direction == required => Ok(()),
            SessionState::Open { direction, .. } => Err(Error::WrongDirection {
                required,
                open: Some(direction),
            }),
            SessionState::Closed => Err(Error::WrongDirection {
                required,
                open: None,
            }),
        }
    }

    fn drive_ce(&mut self, high: bool) -> Result<()> {
        self.ce.write(high)?;
        if self.ce.read()? != high {
            log::error!(
                "mcp23s17: CE line stuck {}",
                if high { "low" } else { "high" }
            );
            return Err(Error::LineVerifyFailed {
                line: ControlLine::ChipEnable,
                expected: high,
            });
        }
        Ok(())
    }
}

/// An open device session that is closed when dropped
///
/// Use [`Transaction::finish`] to observe errors from closing; a failure
/// to close on drop is logged.
pub struct Transaction<'a, S: SpiBus, C: OutputLine> {
    session: &'a mut DeviceSession<S, C>,
    done: bool,
}

impl<S: SpiBus, C: OutputLine> Transaction<'_, S, C> {
    /// Full-duplex write transfer, see [`DeviceSession::transfer`]
    pub fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.session.transfer(buf)
    }

    /// Read transfer, see [`DeviceSession::read`]
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.session.read(buf)
    }

    /// Read a single byte
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.session.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Write bytes, discarding the response
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.session.write_all(data)
    }

    /// Close the session and report the result
    pub fn finish(mut self) -> Result<()> {
        self.done = true;
        self.session.close_device()
    }
}

impl<S: SpiBus, C: OutputLine> Drop for Transaction<'_, S, C> {
    fn drop(&mut self) {
        if !self.done {
            if let Err(e) = self.session.close_device() {
                log::error!("mcp23s17: failed to close device session: {}", e);
            }
        }
    }
}
