//! Commands that talk to the expanders

use mcpio_core::{control_byte, AddressingMode, Direction, Register, RegisterRef};
use mcpio_platform::Expander;

/// Register addresses covered by a sequential read from 0x00, in order
fn sequential_addresses(mode: AddressingMode) -> Vec<u8> {
    match mode {
        AddressingMode::Bank0 => (0x00..=0x15).collect(),
        AddressingMode::Bank1 => (0x00..=0x0A).chain(0x10..=0x1A).collect(),
    }
}

fn bit_list(register: Register, value: u8) -> String {
    let bits: Vec<_> = register.descriptor().set_bits(value).collect();
    if bits.is_empty() {
        "-".to_string()
    } else {
        bits.join(" ")
    }
}

/// Reset the chain and print the devices found
pub fn run_scan(driver: &mut Expander) -> Result<(), Box<dyn std::error::Error>> {
    let devices = driver.init()?;
    if devices.is_empty() {
        println!("No MCP23S17 devices found");
        return Ok(());
    }
    println!("Found {} device(s) ({} mode):", devices.len(), driver.mode());
    for address in devices.iter() {
        let control = control_byte(address, Direction::Write)?;
        println!("  address {} (control byte 0x{:02X})", address, control);
    }
    Ok(())
}

/// Pulse RESET
pub fn run_reset(driver: &mut Expander) -> Result<(), Box<dyn std::error::Error>> {
    driver.reset()?;
    println!("Devices reset");
    Ok(())
}

/// Read one register
pub fn run_read(
    driver: &mut Expander,
    address: u8,
    register: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let register: RegisterRef = register.parse()?;
    driver.init()?;
    let value = driver.read_register(address, register)?;

    let named = match register {
        RegisterRef::Named(reg) => Some(reg),
        RegisterRef::Raw(addr) => Register::from_address(addr, driver.mode()),
    };
    match named {
        Some(reg) => println!(
            "{} @ 0x{:02X}: 0x{:02X} (0b{:08b}) [{}]",
            reg,
            reg.address(driver.mode()),
            value,
            value,
            bit_list(reg, value)
        ),
        None => println!("{}: 0x{:02X} (0b{:08b})", register, value, value),
    }
    Ok(())
}

/// Write one register
pub fn run_write(
    driver: &mut Expander,
    address: u8,
    register: &str,
    value: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let register: RegisterRef = register.parse()?;
    driver.init()?;
    driver.write_register(address, register, value)?;
    log::info!("Wrote 0x{:02X} to {} on device {}", value, register, address);
    Ok(())
}

/// Read and decode every register of one device
pub fn run_dump(driver: &mut Expander, address: u8) -> Result<(), Box<dyn std::error::Error>> {
    driver.init()?;
    let mode = driver.mode();
    let addresses = sequential_addresses(mode);
    let mut values = vec![0u8; addresses.len()];
    driver.read_registers(address, 0x00u8, &mut values)?;

    println!("Device {} ({} mode)", address, mode);
    println!("{:<6} {:<10} {:>5}  Bits set", "Addr", "Register", "Value");
    println!("{}", "-".repeat(48));
    for (reg_addr, value) in addresses.iter().zip(&values) {
        // Skip unmapped addresses and the second IOCON address
        let Some(reg) = Register::from_address(*reg_addr, mode) else {
            continue;
        };
        if reg.address(mode) != *reg_addr {
            continue;
        }
        println!(
            "0x{:02X}   {:<10} 0x{:02X}  {}",
            reg_addr,
            reg.name(),
            value,
            bit_list(reg, *value)
        );
    }

    let int_a = driver.interrupt_a()?;
    let int_b = driver.interrupt_b()?;
    if let (Some(a), Some(b)) = (int_a, int_b) {
        println!();
        println!("INTA: {}  INTB: {}", level(a), level(b));
    }
    Ok(())
}

/// Clock a test pattern with CE high and compare
pub fn run_loopback(driver: &mut Expander) -> Result<(), Box<dyn std::error::Error>> {
    if driver.loopback_check()? {
        println!("Loopback OK");
        Ok(())
    } else {
        Err("Loopback failed: MISO did not return the transmitted pattern".into())
    }
}

fn level(high: bool) -> &'static str {
    if high {
        "high"
    } else {
        "low"
    }
}
