//! Register file of one simulated MCP23S17

use mcpio_core::register::{AddressingMode, Iocon, Register, MAX_REGISTER_ADDRESS};

/// Register values after power-on or reset
fn power_on_value(register: Register) -> u8 {
    match register {
        Register::IODIRA | Register::IODIRB => 0xFF,
        _ => 0x00,
    }
}

/// One simulated expander
#[derive(Debug, Clone)]
pub struct SimChip {
    /// Hardware address strapped on A2..A0
    strap: u8,
    /// Register values indexed by `Register as usize`
    regs: [u8; 21],
    /// Externally applied pin levels of port A and B
    pins: [u8; 2],
}

impl SimChip {
    /// A chip strapped to `strap`, in its power-on state
    pub fn new(strap: u8) -> Self {
        let mut chip = Self {
            strap,
            regs: [0; 21],
            pins: [0; 2],
        };
        chip.power_on();
        chip
    }

    /// Return every register to its power-on value
    pub fn power_on(&mut self) {
        for register in Register::ALL {
            self.regs[register as usize] = power_on_value(register);
        }
    }

    /// Hardware address strap
    pub fn strap(&self) -> u8 {
        self.strap
    }

    /// Current IOCON value
    pub fn iocon(&self) -> Iocon {
        Iocon::from_bits_truncate(self.regs[Register::IOCON as usize])
    }

    /// Addressing mode selected by IOCON.BANK
    pub fn mode(&self) -> AddressingMode {
        AddressingMode::from_iocon(self.iocon())
    }

    /// Whether a control byte for `address` selects this chip
    ///
    /// With HAEN clear the address pins are ignored and the chip answers
    /// to address 0 only.
    pub fn selected_by(&self, address: u8) -> bool {
        if self.iocon().contains(Iocon::HAEN) {
            address == self.strap
        } else {
            address == 0
        }
    }

    /// Stored value of a register, bypassing port logic
    pub fn register(&self, register: Register) -> u8 {
        self.regs[register as usize]
    }

    /// Drive the external pins of port A (`port == 0`) or B
    pub fn set_pins(&mut self, port: usize, levels: u8) {
        self.pins[port & 1] = levels;
    }

    /// Bus read of the register at `address` in the current mode
    pub fn read(&self, address: u8) -> u8 {
        match Register::from_address(address, self.mode()) {
            Some(Register::GPIOA) => self.port_level(0),
            Some(Register::GPIOB) => self.port_level(1),
            Some(register) => self.regs[register as usize],
            None => 0x00,
        }
    }

    /// Bus write of the register at `address` in the current mode
    pub fn write(&mut self, address: u8, value: u8) {
        let Some(register) = Register::from_address(address, self.mode()) else {
            log::debug!("sim: chip {} ignoring write to 0x{:02X}", self.strap, address);
            return;
        };
        match register {
            // Writing the port writes the output latch
            Register::GPIOA => self.regs[Register::OLATA as usize] = value,
            Register::GPIOB => self.regs[Register::OLATB as usize] = value,
            Register::INTFA | Register::INTFB | Register::INTCAPA | Register::INTCAPB => {}
            // Bit 0 is unimplemented
            Register::IOCON => self.regs[register as usize] = value & 0xFE,
            _ => self.regs[register as usize] = value,
        }
    }

    /// Address the pointer moves to after a data byte at `address`
    pub fn next_address(&self, address: u8) -> u8 {
        let iocon = self.iocon();
        let bank1 = iocon.contains(Iocon::BANK);
        if iocon.contains(Iocon::SEQOP) {
            // Byte mode: BANK0 toggles within the A/B pair, BANK1 stays put
            return if bank1 { address } else { address ^ 1 };
        }
        if bank1 {
            match address {
                0x0A => 0x10,
                MAX_REGISTER_ADDRESS => 0x00,
                _ => address + 1,
            }
        } else if address >= 0x15 {
            0x00
        } else {
            address + 1
        }
    }

    /// Level seen on a port: latch for outputs, pins for inputs, then polarity
    fn port_level(&self, port: usize) -> u8 {
        let (iodir, ipol, olat) = if port == 0 {
            (Register::IODIRA, Register::IPOLA, Register::OLATA)
        } else {
            (Register::IODIRB, Register::IPOLB, Register::OLATB)
        };
        let inputs = self.regs[iodir as usize];
        let level = (self.pins[port] & inputs) | (self.regs[olat as usize] & !inputs);
        level ^ (self.regs[ipol as usize] & inputs)
    }
}
