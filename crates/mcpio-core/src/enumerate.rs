//! HAEN-based device discovery
//!
//! After reset every MCP23S17 ignores its address pins and answers to
//! address 0. Writing IOCON with `HAEN` set through address 0 therefore
//! reaches all chips at once; from then on each chip only answers to the
//! address strapped on its A2..A0 pins. Reading IOCON back from each of the
//! eight addresses tells which ones are populated.

use crate::devices::DeviceAddressSet;
use crate::error::{Error, Result};
use crate::hal::{OutputLine, SpiBus};
use crate::protocol::{Direction, RegisterRef, MAX_DEVICES};
use crate::register::{AddressingMode, Iocon, Register};
use crate::session::{DeviceSession, Discovery};

/// IOCON bit 0 is unimplemented and reads as 0 on a real chip
const IOCON_UNIMPLEMENTED: u8 = 0x01;

/// Enumerate devices with the default configuration
///
/// See [`enumerate_with`].
pub fn enumerate<S: SpiBus, C: OutputLine>(
    session: &mut DeviceSession<S, C>,
) -> Result<DeviceAddressSet> {
    enumerate_with(session, Iocon::empty())
}

/// Enumerate devices, writing `extra` IOCON bits along with `HAEN`
///
/// The configuration byte is written whole (`HAEN`, the `BANK` bit of the
/// session's addressing mode, and `extra`), not OR-ed into the current
/// value. It is sent to the BANK0 IOCON address because chips come out of
/// reset in BANK0; the same write moves them to the session's mode.
///
/// Must run once after each reset. Fails with [`Error::ResetRequired`]
/// before the first reset and [`Error::AlreadyEnumerated`] when devices
/// were already enumerated since the last reset. Finding no device is not
/// an error.
pub fn enumerate_with<S: SpiBus, C: OutputLine>(
    session: &mut DeviceSession<S, C>,
    extra: Iocon,
) -> Result<DeviceAddressSet> {
    match session.discovery() {
        Discovery::Unreset => return Err(Error::ResetRequired),
        Discovery::Enumerated(_) => return Err(Error::AlreadyEnumerated),
        Discovery::Reset => {}
    }

    let config = extra.difference(Iocon::BANK) | Iocon::HAEN | session.mode().iocon();
    let iocon_after_reset = RegisterRef::Raw(Register::IOCON.address(AddressingMode::Bank0));

    log::debug!(
        "mcp23s17: enabling hardware addressing (IOCON=0x{:02X})",
        config.bits()
    );
    session.open_unchecked(0, iocon_after_reset, Direction::Write)?;
    let written = session.write_all(&[config.bits()]);
    session.close_device()?;
    written?;

    let mut found = DeviceAddressSet::empty();
    for address in 0..MAX_DEVICES {
        let iocon = read_iocon(session, address)?;
        if responds(iocon) {
            log::debug!(
                "mcp23s17: device at address {} (IOCON=0x{:02X})",
                address,
                iocon
            );
            found.insert(address)?;
        } else {
            log::trace!(
                "mcp23s17: no device at address {} (read 0x{:02X})",
                address,
                iocon
            );
        }
    }

    session.set_devices(found);
    if found.is_empty() {
        log::warn!("mcp23s17: no devices found on the bus");
    } else {
        log::info!("mcp23s17: found {} device(s) at {}", found.len(), found);
    }
    Ok(found)
}

/// Read IOCON from `address`, closing the session on every path
fn read_iocon<S: SpiBus, C: OutputLine>(
    session: &mut DeviceSession<S, C>,
    address: u8,
) -> Result<u8> {
    session.open_unchecked(address, Register::IOCON.into(), Direction::Read)?;
    let mut buf = [0u8; 1];
    let read = session.read(&mut buf);
    session.close_device()?;
    read?;
    Ok(buf[0])
}

/// Whether an IOCON readback comes from a chip with hardware addressing on
///
/// An undriven MISO line reads 0x00 or 0xFF; the latter is rejected via
/// the unimplemented bit 0.
fn responds(iocon: u8) -> bool {
    iocon & Iocon::HAEN.bits() != 0 && iocon & IOCON_UNIMPLEMENTED == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlLine;
    use crate::mock::{MockBus, MockLine, Wires};
    use std::vec;
    use std::vec::Vec;

    const CE: ControlLine = ControlLine::ChipEnable;

    /// Bus where the listed addresses answer IOCON reads with `value`
    fn chips(wires: &Wires, present: &'static [u8], value: u8) -> MockBus {
        wires.bus().with_responder(move |header, buf| {
            let address = (header[0] >> 1) & 0x07;
            let read = header[0] & 1 == 1;
            if read && present.contains(&address) {
                buf.fill(value);
            }
        })
    }

    fn reset_session(
        bus: MockBus,
        wires: &Wires,
        mode: AddressingMode,
    ) -> DeviceSession<MockBus, MockLine> {
        let mut session = DeviceSession::new(bus, wires.line(CE, true), mode).unwrap();
        session.mark_reset().unwrap();
        wires.clear();
        session
    }

    #[test]
    fn test_finds_present_devices() {
        let wires = Wires::new();
        let bus = chips(&wires, &[2, 5], 0x08);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank0);

        let found = enumerate(&mut session).unwrap();
        assert_eq!(found.iter().collect::<Vec<_>>(), [2, 5]);
        assert_eq!(session.devices(), found);
        assert_eq!(
            session.open_device(3, Register::GPIOA, Direction::Read),
            Err(Error::UnknownDevice(3))
        );
        session.open_device(5, Register::GPIOA, Direction::Read).unwrap();
    }

    #[test]
    fn test_wire_sequence() {
        let wires = Wires::new();
        let bus = chips(&wires, &[0], 0x08);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank0);
        enumerate(&mut session).unwrap();

        let transfers = wires.transfers();
        // HAEN write: header + one data byte
        assert_eq!(transfers[0], vec![0x40, 0x0A]);
        assert_eq!(transfers[1], vec![0x08]);
        // Then one IOCON read per candidate address, ascending
        for address in 0..8u8 {
            let i = 2 + 2 * address as usize;
            assert_eq!(transfers[i], vec![0x41 | (address << 1), 0x0A]);
            assert_eq!(transfers[i + 1], vec![0x00]);
        }
        assert_eq!(transfers.len(), 18);
        // Nine framed transactions, each with exactly one low/high pair
        assert_eq!(wires.line_writes(CE).len(), 18);
        assert!(!session.is_open());
    }

    #[test]
    fn test_bank1_writes_full_config_at_reset_address() {
        let wires = Wires::new();
        let bus = chips(&wires, &[1], 0x88);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank1);

        let found = enumerate_with(&mut session, Iocon::MIRROR | Iocon::BANK).unwrap();
        assert_eq!(found.iter().collect::<Vec<_>>(), [1]);

        let transfers = wires.transfers();
        assert_eq!(transfers[0], vec![0x40, 0x0A]);
        assert_eq!(transfers[1], vec![0xC8]);
        // Probes use the BANK1 IOCON address
        assert_eq!(transfers[2], vec![0x41, 0x05]);
    }

    #[test]
    fn test_no_devices_is_not_an_error() {
        let wires = Wires::new();
        let bus = chips(&wires, &[], 0x08);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank0);

        let found = enumerate(&mut session).unwrap();
        assert!(found.is_empty());
        assert_eq!(session.discovery(), Discovery::Enumerated(found));
        assert_eq!(
            session.open_device(0, Register::GPIOA, Direction::Read),
            Err(Error::UnknownDevice(0))
        );
    }

    #[test]
    fn test_floating_bus_is_not_a_device() {
        let wires = Wires::new();
        let bus = chips(&wires, &[0, 1, 2, 3, 4, 5, 6, 7], 0xFF);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank0);
        assert!(enumerate(&mut session).unwrap().is_empty());
    }

    #[test]
    fn test_requires_reset() {
        let wires = Wires::new();
        let mut session =
            DeviceSession::new(wires.bus(), wires.line(CE, true), AddressingMode::Bank0).unwrap();
        assert_eq!(enumerate(&mut session), Err(Error::ResetRequired));
    }

    #[test]
    fn test_refuses_second_run() {
        let wires = Wires::new();
        let bus = chips(&wires, &[0], 0x08);
        let mut session = reset_session(bus, &wires, AddressingMode::Bank0);
        enumerate(&mut session).unwrap();
        wires.clear();

        assert_eq!(enumerate(&mut session), Err(Error::AlreadyEnumerated));
        assert!(wires.events().is_empty());

        session.mark_reset().unwrap();
        assert!(enumerate(&mut session).is_ok());
    }

    #[test]
    fn test_bus_failure_propagates() {
        let wires = Wires::new();
        let mut session = reset_session(wires.bus().failing(), &wires, AddressingMode::Bank0);
        assert_eq!(enumerate(&mut session), Err(Error::BusTransferFailed));
        assert_eq!(session.discovery(), Discovery::Reset);
    }
}
