//! Backend registry and initialization
//!
//! This module opens an expander chain on real hardware or on the
//! simulator, and hides the concrete bus and line types behind
//! [`ExpanderHandle`].

use std::fmt;
use std::str::FromStr;

use mcpio_core::Mcp23s17;
use mcpio_sim::{SimConfig, Simulator};

use crate::config::ExpanderConfig;
use crate::detect::{detect, Platform};
use crate::devicetree::{simulated_chip_selects, validate_chip_select};
use crate::error::{PlatformError, Result};
use crate::handle::{BoxedDelay, BoxedInput, BoxedOutput, BoxedSpi, ExpanderHandle};

/// Where the expander chain lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Hardware on a Raspberry Pi, simulator elsewhere
    #[default]
    Auto,
    /// spidev and GPIO character devices
    Hardware,
    /// In-process simulated chain
    Simulated,
}

impl Backend {
    /// Resolve [`Backend::Auto`] for the given platform
    pub fn resolve(self, platform: Platform) -> Backend {
        match self {
            Backend::Auto if platform.has_expander_hardware() => Backend::Hardware,
            Backend::Auto => Backend::Simulated,
            other => other,
        }
    }
}

impl FromStr for Backend {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "hardware" | "hw" => Ok(Backend::Hardware),
            "simulated" | "sim" => Ok(Backend::Simulated),
            _ => Err(PlatformError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Auto => write!(f, "auto"),
            Backend::Hardware => write!(f, "hardware"),
            Backend::Simulated => write!(f, "simulated"),
        }
    }
}

/// Information about a backend
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Canonical name
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Backends compiled into this build
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = vec![BackendInfo {
        name: "auto",
        aliases: &[],
        description: "Hardware on a Raspberry Pi, simulated elsewhere",
    }];

    #[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
    backends.push(BackendInfo {
        name: "hardware",
        aliases: &["hw"],
        description: "Linux spidev (/dev/spidevN.0) and GPIO character device",
    });

    backends.push(BackendInfo {
        name: "simulated",
        aliases: &["sim"],
        description: "Simulated MCP23S17 chain (sim_devices in config)",
    });

    backends
}

/// Open the expander chain described by `config`
///
/// The chip-select wiring is checked against the device tree on hardware
/// and against a fixed table on the simulator. The returned driver is not
/// yet reset or enumerated.
pub fn open_expander(config: &ExpanderConfig, backend: Backend) -> Result<ExpanderHandle> {
    config.validate()?;

    let backend = backend.resolve(detect());
    log::debug!("Opening expander on {} backend", backend);

    match backend {
        Backend::Hardware => open_hardware(config),
        _ => open_simulated(config, SimConfig::with_devices(&config.sim_devices)),
    }
}

/// Open a simulated chain with explicit simulator settings
pub fn open_simulated(config: &ExpanderConfig, sim: SimConfig) -> Result<ExpanderHandle> {
    config.validate()?;
    validate_chip_select(&simulated_chip_selects(), config.spi_bus, config.ce.pin)?;

    let simulator = Simulator::new(sim);
    let spi: BoxedSpi = Box::new(simulator.bus());
    let ce: BoxedOutput = Box::new(simulator.chip_enable());
    let reset: BoxedOutput = Box::new(simulator.reset_line());
    let delay: BoxedDelay = Box::new(simulator.delay());
    let int_a: BoxedInput = Box::new(simulator.int_a());
    let int_b: BoxedInput = Box::new(simulator.int_b());

    let driver = Mcp23s17::new(spi, ce, reset, delay, config.addressing_mode())?
        .with_interrupts(int_a, int_b);
    Ok(ExpanderHandle::new(
        driver,
        Backend::Simulated,
        Some(simulator),
    ))
}

#[cfg(all(feature = "linux-spi", feature = "linux-gpio"))]
fn open_hardware(config: &ExpanderConfig) -> Result<ExpanderHandle> {
    use mcpio_core::hal::StdDelay;
    use mcpio_linux_gpio::{GpioInput, GpioOutput};
    use mcpio_linux_spi::{LinuxSpi, LinuxSpiConfig};

    let chip_selects = crate::devicetree::read_spi_chip_selects()?;
    validate_chip_select(&chip_selects, config.spi_bus, config.ce.pin)?;

    let spi_config = LinuxSpiConfig::for_bus(config.spi_bus)
        .with_speed(config.spi_speed_hz)
        .with_mode(config.spi_mode);
    let spi: BoxedSpi = Box::new(LinuxSpi::open(&spi_config)?);

    let chip = &config.gpio_chip;
    let ce_line = GpioOutput::request(chip, config.ce.pin, config.ce.initial_level())?;
    let reset_line = GpioOutput::request(chip, config.reset.pin, config.reset.initial_level())?;
    let int_a_line = GpioInput::request(chip, config.int_a.pin)?;
    let int_b_line = GpioInput::request(chip, config.int_b.pin)?;

    log::info!(
        "Opened {} at {} Hz on {}: CE line {}, RESET line {}, INTA line {}, INTB line {}",
        spi_config.device,
        spi_config.speed_hz,
        chip,
        ce_line.offset(),
        reset_line.offset(),
        int_a_line.offset(),
        int_b_line.offset()
    );

    let ce: BoxedOutput = Box::new(ce_line);
    let reset: BoxedOutput = Box::new(reset_line);
    let int_a: BoxedInput = Box::new(int_a_line);
    let int_b: BoxedInput = Box::new(int_b_line);
    let delay: BoxedDelay = Box::new(StdDelay);

    let driver = Mcp23s17::new(spi, ce, reset, delay, config.addressing_mode())?
        .with_interrupts(int_a, int_b);
    Ok(ExpanderHandle::new(driver, Backend::Hardware, None))
}

#[cfg(not(all(feature = "linux-spi", feature = "linux-gpio")))]
fn open_hardware(_config: &ExpanderConfig) -> Result<ExpanderHandle> {
    if cfg!(feature = "linux-spi") {
        Err(PlatformError::BackendUnavailable("linux-gpio"))
    } else {
        Err(PlatformError::BackendUnavailable("linux-spi"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpio_core::{Discovery, Register};

    #[test]
    fn test_backend_names() {
        assert_eq!("sim".parse::<Backend>().unwrap(), Backend::Simulated);
        assert_eq!("Hardware".parse::<Backend>().unwrap(), Backend::Hardware);
        assert!(matches!(
            "usb".parse::<Backend>(),
            Err(PlatformError::UnknownBackend(_))
        ));
        assert_eq!(Backend::Simulated.to_string(), "simulated");
    }

    #[test]
    fn test_resolve_auto() {
        assert_eq!(Backend::Auto.resolve(Platform::RaspberryPi), Backend::Hardware);
        assert_eq!(Backend::Auto.resolve(Platform::Linux), Backend::Simulated);
        assert_eq!(Backend::Simulated.resolve(Platform::RaspberryPi), Backend::Simulated);
    }

    #[test]
    fn test_available_backends() {
        let names: Vec<_> = available_backends().iter().map(|b| b.name).collect();
        assert!(names.contains(&"auto"));
        assert!(names.contains(&"simulated"));
    }

    #[test]
    fn test_open_simulated() {
        let config = ExpanderConfig {
            sim_devices: vec![1, 6],
            ..Default::default()
        };
        let mut handle = open_expander(&config, Backend::Simulated).unwrap();
        assert_eq!(handle.backend(), Backend::Simulated);

        let driver = handle.driver();
        assert_eq!(driver.discovery(), Discovery::Unreset);
        let devices = driver.init().unwrap();
        assert_eq!(devices.iter().collect::<Vec<_>>(), vec![1, 6]);

        driver.write_register(6, Register::OLATA, 0x3C).unwrap();
        let sim = handle.simulator().unwrap();
        assert_eq!(sim.register(6, Register::OLATA), Some(0x3C));
    }

    #[test]
    fn test_open_rejects_bad_wiring() {
        let config = ExpanderConfig {
            spi_bus: 0,
            ..Default::default()
        };
        assert!(matches!(
            open_expander(&config, Backend::Simulated),
            Err(PlatformError::NoChipSelect(_))
        ));

        let mut config = ExpanderConfig::default();
        config.ce.pin = 8;
        assert!(matches!(
            open_expander(&config, Backend::Simulated),
            Err(PlatformError::ChipSelectMismatch { .. })
        ));

        config.ce.pin = 13;
        config.spi_mode = 7;
        assert!(matches!(
            open_expander(&config, Backend::Simulated),
            Err(PlatformError::InvalidConfig(_))
        ));

        config.spi_mode = 0;
        config.ce.initial = Some(false);
        assert!(matches!(
            open_expander(&config, Backend::Simulated),
            Err(PlatformError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_shared_handle() {
        let handle = open_expander(&ExpanderConfig::default(), Backend::Simulated).unwrap();
        let shared = handle.into_shared();
        shared.with_driver(|d| d.init()).unwrap();
        shared.write_register(0, Register::IODIRA, 0x0F).unwrap();
        assert_eq!(shared.read_register(0, Register::IODIRA).unwrap(), 0x0F);
    }
}
