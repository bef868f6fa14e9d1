//! mcpio - MCP23S17 SPI I/O expander tool
//!
//! Resets and enumerates a chain of MCP23S17 expanders that share one SPI
//! bus, one GPIO chip-enable and one RESET line, and reads or writes their
//! registers.
//!
//! # Backends
//!
//! - **hardware**: Linux spidev plus GPIO character device lines, checked
//!   against the device tree's SPI chip-select wiring
//! - **simulated**: an in-process chain of simulated chips
//!
//! `auto` picks hardware on a Raspberry Pi and the simulator elsewhere.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use mcpio_platform::{
    detect, open_expander, open_simulated, Backend, ExpanderConfig, ExpanderHandle, SimConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; -v/-vv override the default and RUST_LOG level
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = verbosity_level(cli.verbose) {
        logger.filter_level(level);
    }
    logger.init();

    let config = load_config(&cli)?;
    let backend: Backend = cli.backend.parse()?;

    match cli.command {
        Commands::Registers => {
            commands::list_registers();
            Ok(())
        }
        Commands::Platform => {
            commands::show_platform(&config);
            Ok(())
        }
        Commands::Scan => commands::run_scan(open(&config, backend)?.driver()),
        Commands::Reset => commands::run_reset(open(&config, backend)?.driver()),
        Commands::Read { address, register } => {
            commands::run_read(open(&config, backend)?.driver(), address, &register)
        }
        Commands::Write {
            address,
            register,
            value,
        } => commands::run_write(open(&config, backend)?.driver(), address, &register, value),
        Commands::Dump { address } => commands::run_dump(open(&config, backend)?.driver(), address),
        Commands::Loopback => {
            // A simulated bus only echoes when MOSI is wired to MISO
            let mut handle = if backend.resolve(detect()) == Backend::Simulated {
                let sim = SimConfig::with_devices(&config.sim_devices).with_loopback(true);
                open_simulated(&config, sim)?
            } else {
                open(&config, backend)?
            };
            commands::run_loopback(handle.driver())
        }
    }
}

/// Log level selected by the number of `-v` flags
fn verbosity_level(verbose: u8) -> Option<log::LevelFilter> {
    match verbose {
        0 => None, // default (info)
        1 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

/// Load the config file, if any, and apply command-line overrides
fn load_config(cli: &Cli) -> Result<ExpanderConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ExpanderConfig::from_toml_file(path)?,
        None => ExpanderConfig::default(),
    };

    if let Some(bank) = cli.bank {
        config.bank = bank;
    }
    if let Some(bus) = cli.spi_bus {
        config.spi_bus = bus;
    }
    if let Some(speed) = cli.spi_speed {
        config.spi_speed_hz = speed;
    }
    if let Some(mode) = cli.spi_mode {
        config.spi_mode = mode;
    }
    if let Some(devices) = &cli.sim_devices {
        config.sim_devices = devices.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open(
    config: &ExpanderConfig,
    backend: Backend,
) -> Result<ExpanderHandle, Box<dyn std::error::Error>> {
    let handle = open_expander(config, backend)?;
    log::debug!("Using {} backend", handle.backend());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some(log::LevelFilter::Debug));
        assert_eq!(verbosity_level(3), Some(log::LevelFilter::Trace));
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "mcpio",
            "-vv",
            "--bank",
            "1",
            "--spi-speed",
            "0x7A120",
            "--sim-devices",
            "2,5",
            "scan",
        ]);
        assert_eq!(cli.verbose, 2);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.bank, 1);
        assert_eq!(config.spi_speed_hz, 500_000);
        assert_eq!(config.sim_devices, vec![2, 5]);
    }
}
