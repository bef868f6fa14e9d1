//! Commands that need no expander

use mcpio_core::register::REGISTERS;
use mcpio_platform::devicetree::{read_spi_chip_selects, simulated_chip_selects};
use mcpio_platform::{available_backends, detect, ExpanderConfig, Platform};

/// Print the register map in both addressing modes
pub fn list_registers() {
    println!("MCP23S17 registers:");
    println!();
    println!(
        "{:<10} {:>6} {:>6}  {:<40} Bits (7..0)",
        "Register", "BANK0", "BANK1", "Description"
    );
    println!("{}", "-".repeat(110));

    for reg in REGISTERS.iter() {
        let bits: Vec<_> = reg.bits.iter().map(|b| b.unwrap_or("-")).collect();
        println!(
            "{:<10} {:>6} {:>6}  {:<40} {}",
            reg.name,
            format!("0x{:02X}", reg.bank0),
            format!("0x{:02X}", reg.bank1),
            reg.description,
            bits.join(" ")
        );
    }
}

/// Print platform, backends and chip-select wiring
pub fn show_platform(config: &ExpanderConfig) {
    let platform = detect();
    println!("Platform: {}", platform);
    println!();

    println!("Backends:");
    for info in available_backends() {
        if info.aliases.is_empty() {
            println!("  {:<10} - {}", info.name, info.description);
        } else {
            println!(
                "  {:<10} - {} (aliases: {})",
                info.name,
                info.description,
                info.aliases.join(", ")
            );
        }
    }
    println!();

    let table = if platform == Platform::RaspberryPi {
        match read_spi_chip_selects() {
            Ok(table) => table,
            Err(e) => {
                log::warn!("{}", e);
                return;
            }
        }
    } else {
        println!("(no device tree, showing simulated wiring)");
        simulated_chip_selects()
    };

    println!("SPI chip selects:");
    for (bus, selects) in &table {
        let list: Vec<_> = selects.iter().map(|cs| cs.to_string()).collect();
        if list.is_empty() {
            println!("  {:<14} none", bus);
        } else {
            println!("  {:<14} {}", bus, list.join(", "));
        }
    }
    println!();

    println!("Configured wiring:");
    println!(
        "  SPI{} mode {} at {} Hz, {}",
        config.spi_bus,
        config.spi_mode,
        config.spi_speed_hz,
        config.addressing_mode()
    );
    println!(
        "  {}: CE GPIO{}, RESET GPIO{}, INTA GPIO{}, INTB GPIO{}",
        config.gpio_chip, config.ce.pin, config.reset.pin, config.int_a.pin, config.int_b.pin
    );
}
