//! mcpio-sim - Simulated MCP23S17 chain for testing
//!
//! This crate provides a bus, control lines and a delay that talk to an
//! in-memory chain of MCP23S17 expanders. It's useful for testing and
//! development without real hardware.
//!
//! The simulation decodes the byte stream like the chips do: CE going low
//! starts a frame, the first byte selects chip and direction, the second
//! sets the register pointer, and every following byte reads or writes the
//! register under the pointer before it advances. Chips honour HAEN, BANK,
//! SEQOP and the IOCON alias, and return to power-on state while RESET is
//! held low.
//!
//! # Example
//!
//! ```
//! use mcpio_core::{AddressingMode, Mcp23s17, Register};
//! use mcpio_sim::{SimConfig, Simulator};
//!
//! let sim = Simulator::new(SimConfig::with_devices(&[2, 5]));
//! let mut dev = Mcp23s17::new(
//!     sim.bus(),
//!     sim.chip_enable(),
//!     sim.reset_line(),
//!     sim.delay(),
//!     AddressingMode::Bank0,
//! )?;
//! let found = dev.init()?;
//! assert_eq!(found.iter().collect::<Vec<_>>(), [2, 5]);
//!
//! dev.write_register(5, Register::OLATA, 0xA5)?;
//! assert_eq!(sim.register(5, Register::OLATA), Some(0xA5));
//! # Ok::<(), mcpio_core::Error>(())
//! ```

mod chip;

pub use chip::SimChip;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mcpio_core::error::{Error, Result};
use mcpio_core::hal::{Delay, InputLine, OutputLine, SpiBus};
use mcpio_core::protocol::{CONTROL_OPCODE, MAX_DEVICES};
use mcpio_core::register::Register;

/// Configuration of the simulated hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Address straps of the chips on the bus
    pub devices: Vec<u8>,
    /// MISO is pulled up, so undriven bytes read 0xFF instead of 0x00
    pub float_high: bool,
    /// MOSI is wired to MISO, so transfers with CE high echo back
    pub loopback: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            devices: vec![0],
            float_high: false,
            loopback: false,
        }
    }
}

impl SimConfig {
    /// Chips strapped at the given addresses
    ///
    /// Addresses above 7 cannot be strapped and are dropped.
    pub fn with_devices(devices: &[u8]) -> Self {
        Self {
            devices: devices.to_vec(),
            ..Default::default()
        }
    }

    /// Set whether MISO floats high
    pub fn with_float_high(mut self, float_high: bool) -> Self {
        self.float_high = float_high;
        self
    }

    /// Set whether MOSI is looped back to MISO
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }
}

/// Decoder state within one CE frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// CE high
    Idle,
    /// CE low, waiting for the control byte
    Control,
    /// Control byte received, waiting for the register address
    Register { address: u8, read: bool },
    /// Data phase
    Data { address: u8, read: bool, pointer: u8 },
    /// Control byte did not carry the device opcode
    Ignored,
}

#[derive(Debug)]
struct Chain {
    chips: Vec<SimChip>,
    float: u8,
    loopback: bool,
    frame: Frame,
    ce: bool,
    ce_stuck: Option<bool>,
    reset: bool,
    reset_stuck: Option<bool>,
    int_a: bool,
    int_b: bool,
    bus_failing: bool,
    slept_ms: u64,
    frames: usize,
}

impl Chain {
    fn new(config: &SimConfig) -> Self {
        let mut straps: Vec<u8> = config
            .devices
            .iter()
            .copied()
            .filter(|&a| a < MAX_DEVICES)
            .collect();
        straps.sort_unstable();
        straps.dedup();
        Self {
            chips: straps.into_iter().map(SimChip::new).collect(),
            float: if config.float_high { 0xFF } else { 0x00 },
            loopback: config.loopback,
            frame: Frame::Idle,
            ce: true,
            ce_stuck: None,
            reset: true,
            reset_stuck: None,
            int_a: true,
            int_b: true,
            bus_failing: false,
            slept_ms: 0,
            frames: 0,
        }
    }

    fn set_ce(&mut self, high: bool) {
        let level = self.ce_stuck.unwrap_or(high);
        if self.ce && !level {
            self.frame = Frame::Control;
            self.frames += 1;
        } else if level {
            self.frame = Frame::Idle;
        }
        self.ce = level;
    }

    fn set_reset(&mut self, high: bool) {
        let level = self.reset_stuck.unwrap_or(high);
        if !level {
            for chip in &mut self.chips {
                chip.power_on();
            }
            self.frame = if self.ce { Frame::Idle } else { Frame::Ignored };
        }
        self.reset = level;
    }

    /// Clock one byte, returning what appears on MISO
    fn clock(&mut self, mosi: u8) -> u8 {
        if !self.reset {
            return self.float;
        }
        match self.frame {
            Frame::Idle => {
                if self.loopback {
                    mosi
                } else {
                    self.float
                }
            }
            Frame::Control => {
                self.frame = if mosi & 0xF0 == CONTROL_OPCODE {
                    Frame::Register {
                        address: (mosi >> 1) & 0x07,
                        read: mosi & 1 == 1,
                    }
                } else {
                    log::debug!("sim: ignoring frame with control byte 0x{:02X}", mosi);
                    Frame::Ignored
                };
                self.float
            }
            Frame::Register { address, read } => {
                self.frame = Frame::Data {
                    address,
                    read,
                    pointer: mosi,
                };
                self.float
            }
            Frame::Data {
                address,
                read,
                pointer,
            } => {
                let mut miso = None;
                let mut next = pointer;
                for chip in self.chips.iter_mut().filter(|c| c.selected_by(address)) {
                    if read {
                        // Several chips answering at once: open-drain style OR
                        miso = Some(miso.unwrap_or(0) | chip.read(pointer));
                    } else {
                        chip.write(pointer, mosi);
                    }
                    next = chip.next_address(pointer);
                }
                self.frame = Frame::Data {
                    address,
                    read,
                    pointer: next,
                };
                miso.unwrap_or(self.float)
            }
            Frame::Ignored => self.float,
        }
    }

    fn chip(&self, address: u8) -> Option<&SimChip> {
        self.chips.iter().find(|c| c.strap() == address)
    }
}

/// Handle to a simulated chain; hands out bus, lines and delay
///
/// All handles share the same state, so the test can inspect the chips
/// while the driver owns the bus.
#[derive(Clone)]
pub struct Simulator {
    chain: Arc<Mutex<Chain>>,
}

impl Simulator {
    /// Build a chain from `config`
    pub fn new(config: SimConfig) -> Self {
        let chain = Chain::new(&config);
        log::debug!(
            "sim: {} chip(s) at {:?}",
            chain.chips.len(),
            chain.chips.iter().map(SimChip::strap).collect::<Vec<_>>()
        );
        Self {
            chain: Arc::new(Mutex::new(chain)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Chain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The SPI bus
    pub fn bus(&self) -> SimBus {
        SimBus { sim: self.clone() }
    }

    /// The chip-enable output line
    pub fn chip_enable(&self) -> SimOutput {
        SimOutput {
            sim: self.clone(),
            role: OutputRole::ChipEnable,
        }
    }

    /// The RESET output line
    pub fn reset_line(&self) -> SimOutput {
        SimOutput {
            sim: self.clone(),
            role: OutputRole::Reset,
        }
    }

    /// The INTA input line
    pub fn int_a(&self) -> SimInput {
        SimInput {
            sim: self.clone(),
            port_b: false,
        }
    }

    /// The INTB input line
    pub fn int_b(&self) -> SimInput {
        SimInput {
            sim: self.clone(),
            port_b: true,
        }
    }

    /// A delay that records instead of sleeping
    pub fn delay(&self) -> SimDelay {
        SimDelay { sim: self.clone() }
    }

    /// Stored register value of the chip strapped at `address`
    pub fn register(&self, address: u8, register: Register) -> Option<u8> {
        self.lock().chip(address).map(|c| c.register(register))
    }

    /// Apply external levels to port A (`port == 0`) or B of a chip
    pub fn set_pins(&self, address: u8, port: usize, levels: u8) {
        let mut chain = self.lock();
        if let Some(chip) = chain.chips.iter_mut().find(|c| c.strap() == address) {
            chip.set_pins(port, levels);
        }
    }

    /// Set the INTA/INTB line levels
    pub fn set_interrupts(&self, int_a: bool, int_b: bool) {
        let mut chain = self.lock();
        chain.int_a = int_a;
        chain.int_b = int_b;
    }

    /// Make CE read back `level` regardless of what is driven
    pub fn stick_chip_enable(&self, level: Option<bool>) {
        self.lock().ce_stuck = level;
    }

    /// Make RESET read back `level` regardless of what is driven
    pub fn stick_reset(&self, level: Option<bool>) {
        self.lock().reset_stuck = level;
    }

    /// Make every bus transfer fail
    pub fn fail_bus(&self, failing: bool) {
        self.lock().bus_failing = failing;
    }

    /// Whether CE is currently low
    pub fn selected(&self) -> bool {
        !self.lock().ce
    }

    /// Number of CE frames started so far
    pub fn frames(&self) -> usize {
        self.lock().frames
    }

    /// Total time requested from [`SimDelay`]
    pub fn slept_ms(&self) -> u64 {
        self.lock().slept_ms
    }
}

/// Simulated SPI bus
pub struct SimBus {
    sim: Simulator,
}

impl SpiBus for SimBus {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut chain = self.sim.lock();
        if chain.bus_failing {
            return Err(Error::BusTransferFailed);
        }
        for byte in buf.iter_mut() {
            *byte = chain.clock(*byte);
        }
        log::trace!("sim: transfer {:02X?}", buf);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputRole {
    ChipEnable,
    Reset,
}

/// Simulated CE or RESET output line
pub struct SimOutput {
    sim: Simulator,
    role: OutputRole,
}

impl OutputLine for SimOutput {
    fn write(&mut self, high: bool) -> Result<()> {
        let mut chain = self.sim.lock();
        match self.role {
            OutputRole::ChipEnable => chain.set_ce(high),
            OutputRole::Reset => chain.set_reset(high),
        }
        Ok(())
    }

    fn read(&mut self) -> Result<bool> {
        let chain = self.sim.lock();
        Ok(match self.role {
            OutputRole::ChipEnable => chain.ce,
            OutputRole::Reset => chain.reset,
        })
    }
}

/// Simulated INTA or INTB input line
pub struct SimInput {
    sim: Simulator,
    port_b: bool,
}

impl InputLine for SimInput {
    fn read(&mut self) -> Result<bool> {
        let chain = self.sim.lock();
        Ok(if self.port_b { chain.int_b } else { chain.int_a })
    }
}

/// Delay that only records the requested time
pub struct SimDelay {
    sim: Simulator,
}

impl Delay for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.sim.lock().slept_ms += ms as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpio_core::register::{AddressingMode, Iocon};
    use mcpio_core::{ControlLine, DeviceAddressSet, Direction, Mcp23s17, RegisterRef};

    type SimDriver = Mcp23s17<SimBus, SimOutput, SimOutput, SimDelay>;

    fn driver(sim: &Simulator, mode: AddressingMode) -> SimDriver {
        Mcp23s17::new(
            sim.bus(),
            sim.chip_enable(),
            sim.reset_line(),
            sim.delay(),
            mode,
        )
        .unwrap()
    }

    #[test]
    fn test_enumerate_finds_straps() {
        let sim = Simulator::new(SimConfig::with_devices(&[5, 2]));
        let mut dev = driver(&sim, AddressingMode::Bank0);

        let found = dev.init().unwrap();
        assert_eq!(found, DeviceAddressSet::from_addresses(&[2, 5]).unwrap());
        assert_eq!(sim.slept_ms(), 200);
        assert_eq!(sim.register(2, Register::IOCON), Some(0x08));
        assert_eq!(
            dev.read_register(3, Register::GPIOA),
            Err(Error::UnknownDevice(3))
        );
        assert!(!sim.selected());
    }

    #[test]
    fn test_register_round_trip() {
        let sim = Simulator::new(SimConfig::with_devices(&[1, 4]));
        let mut dev = driver(&sim, AddressingMode::Bank0);
        dev.init().unwrap();

        dev.write_register(4, Register::IODIRA, 0x00).unwrap();
        dev.write_register(4, Register::GPIOA, 0x3C).unwrap();
        assert_eq!(dev.read_register(4, Register::GPIOA).unwrap(), 0x3C);
        assert_eq!(sim.register(4, Register::OLATA), Some(0x3C));
        // The other chip is untouched
        assert_eq!(sim.register(1, Register::OLATA), Some(0x00));
    }

    #[test]
    fn test_input_pins() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);
        dev.init().unwrap();

        sim.set_pins(0, 1, 0x81);
        assert_eq!(dev.read_port16(0).unwrap(), 0x8100);
        dev.write_register(0, Register::IPOLB, 0xFF).unwrap();
        assert_eq!(dev.read_register(0, Register::GPIOB).unwrap(), 0x7E);
    }

    #[test]
    fn test_bank1_flow() {
        let sim = Simulator::new(SimConfig::with_devices(&[3]));
        let mut dev = driver(&sim, AddressingMode::Bank1);
        dev.init().unwrap();

        assert_eq!(sim.register(3, Register::IOCON), Some(0x88));
        dev.write_register(3, Register::IODIRB, 0x0F).unwrap();
        assert_eq!(sim.register(3, Register::IODIRB), Some(0x0F));
        assert_eq!(
            dev.read_register(3, RegisterRef::Raw(0x10)).unwrap(),
            0x0F
        );
    }

    #[test]
    fn test_sequential_access() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);
        dev.init().unwrap();

        // IODIRA, IODIRB, IPOLA, IPOLB in one transaction
        dev.write_registers(0, Register::IODIRA, &[0x00, 0x0F, 0xAA, 0x55])
            .unwrap();
        let mut buf = [0u8; 4];
        dev.read_registers(0, Register::IODIRA, &mut buf).unwrap();
        assert_eq!(buf, [0x00, 0x0F, 0xAA, 0x55]);

        // Byte mode in BANK0 toggles between the A/B pair
        dev.write_register(0, Register::IOCON, (Iocon::HAEN | Iocon::SEQOP).bits())
            .unwrap();
        dev.write_registers(0, Register::OLATA, &[0x11, 0x22, 0x33])
            .unwrap();
        assert_eq!(sim.register(0, Register::OLATA), Some(0x33));
        assert_eq!(sim.register(0, Register::OLATB), Some(0x22));
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);
        dev.init().unwrap();
        dev.write_register(0, Register::GPPUA, 0xFF).unwrap();

        dev.reset().unwrap();
        assert_eq!(sim.register(0, Register::GPPUA), Some(0x00));
        assert_eq!(sim.register(0, Register::IOCON), Some(0x00));
        assert!(dev.devices().is_empty());
        assert_eq!(dev.enumerate().unwrap().len(), 1);
    }

    #[test]
    fn test_floating_bus_without_chips() {
        let sim = Simulator::new(SimConfig::with_devices(&[]).with_float_high(true));
        let mut dev = driver(&sim, AddressingMode::Bank0);
        assert!(dev.init().unwrap().is_empty());
    }

    #[test]
    fn test_stuck_lines() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);

        sim.stick_reset(Some(true));
        assert_eq!(
            dev.reset(),
            Err(Error::LineVerifyFailed {
                line: ControlLine::Reset,
                expected: false
            })
        );
        assert_eq!(sim.slept_ms(), 100);

        sim.stick_reset(None);
        dev.init().unwrap();
        sim.stick_chip_enable(Some(true));
        assert_eq!(
            dev.session().open_device(0, Register::GPIOA, Direction::Read),
            Err(Error::LineVerifyFailed {
                line: ControlLine::ChipEnable,
                expected: false
            })
        );
    }

    #[test]
    fn test_loopback() {
        let sim = Simulator::new(SimConfig::default().with_loopback(true));
        let mut dev = driver(&sim, AddressingMode::Bank0);
        assert!(dev.loopback_check().unwrap());
        assert_eq!(sim.frames(), 0);

        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);
        assert!(!dev.loopback_check().unwrap());
    }

    #[test]
    fn test_interrupt_lines() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0).with_interrupts(sim.int_a(), sim.int_b());
        sim.set_interrupts(false, true);
        assert_eq!(dev.interrupt_a().unwrap(), Some(false));
        assert_eq!(dev.interrupt_b().unwrap(), Some(true));
    }

    #[test]
    fn test_bus_failure() {
        let sim = Simulator::new(SimConfig::default());
        let mut dev = driver(&sim, AddressingMode::Bank0);
        dev.reset().unwrap();
        sim.fail_bus(true);
        assert_eq!(dev.enumerate(), Err(Error::BusTransferFailed));
        assert!(!sim.selected());
    }
}
