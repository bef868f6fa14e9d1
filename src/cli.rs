//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let n = parse_hex_u32(s)?;
    u8::try_from(n).map_err(|_| format!("Value {} does not fit in a byte", n))
}

/// Parse a hardware address 0-7
fn parse_device_address(s: &str) -> Result<u8, String> {
    match parse_hex_u8(s)? {
        addr @ 0..=7 => Ok(addr),
        addr => Err(format!("Device address {} out of range 0-7", addr)),
    }
}

#[derive(Parser)]
#[command(name = "mcpio")]
#[command(author, version, about = "MCP23S17 SPI I/O expander tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use [auto, hardware, simulated]
    #[arg(short, long, global = true, default_value = "auto")]
    pub backend: String,

    /// IOCON.BANK addressing mode (0 or 1)
    #[arg(long, global = true, value_parser = parse_hex_u8)]
    pub bank: Option<u8>,

    /// SPI bus number (/dev/spidevN.0)
    #[arg(long, global = true, value_parser = parse_hex_u8)]
    pub spi_bus: Option<u8>,

    /// SPI clock in Hz
    #[arg(long, global = true, value_parser = parse_hex_u32)]
    pub spi_speed: Option<u32>,

    /// SPI mode (0-3)
    #[arg(long, global = true, value_parser = parse_hex_u8)]
    pub spi_mode: Option<u8>,

    /// Simulated device addresses (comma-separated)
    #[arg(long, global = true, value_delimiter = ',', value_parser = parse_device_address)]
    pub sim_devices: Option<Vec<u8>>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reset the bus and list the devices that answer
    Scan,

    /// Pulse the RESET line
    Reset,

    /// Read one register and decode its bits
    Read {
        /// Device hardware address (0-7)
        #[arg(value_parser = parse_device_address)]
        address: u8,

        /// Register name (GPIOA) or address (0x12)
        register: String,
    },

    /// Write one register
    Write {
        /// Device hardware address (0-7)
        #[arg(value_parser = parse_device_address)]
        address: u8,

        /// Register name (GPIOA) or address (0x12)
        register: String,

        /// Value to write (decimal or 0x hex)
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Read every register of a device
    Dump {
        /// Device hardware address (0-7)
        #[arg(value_parser = parse_device_address)]
        address: u8,
    },

    /// Show the register map
    Registers,

    /// Show platform, backends and chip-select wiring
    Platform,

    /// Check the SPI bus with an unframed loopback transfer
    Loopback,
}
