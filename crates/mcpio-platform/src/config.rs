//! Expander configuration file
//!
//! Every key is optional; missing keys take the values of the reference
//! wiring on a Raspberry Pi:
//!
//! ```toml
//! gpio_chip = "/dev/gpiochip0"
//! spi_bus = 1
//! spi_speed_hz = "0xF4240"
//! bank = 0
//! sim_devices = [0, 3]
//!
//! [reset]
//! pin = 27
//! direction = "out"
//! initial = true
//!
//! [ce]
//! pin = 13
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use mcpio_core::AddressingMode;
use serde::Deserialize;

use crate::error::{PlatformError, Result};

/// Line direction as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    /// Input line
    In,
    /// Output line
    Out,
}

/// One GPIO line assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PinConfig {
    /// Line offset on the GPIO chip
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub pin: u32,
    /// Direction; the role's natural direction when omitted
    #[serde(default)]
    pub direction: Option<PinDirection>,
    /// Initial level for outputs
    #[serde(default)]
    pub initial: Option<bool>,
}

impl PinConfig {
    fn output(pin: u32) -> Self {
        Self {
            pin,
            direction: Some(PinDirection::Out),
            initial: Some(true),
        }
    }

    fn input(pin: u32) -> Self {
        Self {
            pin,
            direction: Some(PinDirection::In),
            initial: None,
        }
    }

    /// Initial output level, high unless configured otherwise
    pub fn initial_level(&self) -> bool {
        self.initial.unwrap_or(true)
    }
}

/// Wiring and bus settings for one expander chain
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    /// GPIO character device carrying the control lines
    pub gpio_chip: String,
    /// Reset line (output)
    pub reset: PinConfig,
    /// Port A interrupt line (input)
    pub int_a: PinConfig,
    /// Port B interrupt line (input)
    pub int_b: PinConfig,
    /// Chip-enable line (output)
    pub ce: PinConfig,
    /// SPI bus number, `/dev/spidev{bus}.0`
    #[serde(deserialize_with = "deserialize_hex_u8")]
    pub spi_bus: u8,
    /// SPI mode 0..=3
    #[serde(deserialize_with = "deserialize_hex_u8")]
    pub spi_mode: u8,
    /// SPI clock in Hz
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub spi_speed_hz: u32,
    /// IOCON.BANK value to run the chips in
    #[serde(deserialize_with = "deserialize_hex_u8")]
    pub bank: u8,
    /// Hardware addresses of the simulated chips
    pub sim_devices: Vec<u8>,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip0".into(),
            reset: PinConfig::output(27),
            int_a: PinConfig::input(23),
            int_b: PinConfig::input(24),
            ce: PinConfig::output(13),
            spi_bus: 1,
            spi_mode: 0,
            spi_speed_hz: 1_000_000,
            bank: 0,
            sim_devices: vec![0],
        }
    }
}

const KNOWN_KEYS: [&str; 10] = [
    "gpio_chip",
    "reset",
    "int_a",
    "int_b",
    "ce",
    "spi_bus",
    "spi_mode",
    "spi_speed_hz",
    "bank",
    "sim_devices",
];

impl ExpanderConfig {
    /// Load a configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| PlatformError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("config: loading {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Unknown top-level keys are ignored with a warning.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut table: toml::Table = contents.parse()?;
        table.retain(|key, _| {
            let known = KNOWN_KEYS.contains(&key);
            if !known {
                log::warn!("config: ignoring unknown key '{}'", key);
            }
            known
        });
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Check ranges and line roles
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PlatformError::InvalidConfig(msg));

        if self.spi_mode > 3 {
            return invalid(format!("spi_mode {} out of range 0-3", self.spi_mode));
        }
        if self.spi_speed_hz == 0 {
            return invalid("spi_speed_hz must be greater than 0".into());
        }
        if self.bank > 1 {
            return invalid(format!("bank must be 0 or 1, got {}", self.bank));
        }

        let roles = [
            ("reset", &self.reset, PinDirection::Out),
            ("ce", &self.ce, PinDirection::Out),
            ("int_a", &self.int_a, PinDirection::In),
            ("int_b", &self.int_b, PinDirection::In),
        ];
        let mut seen = BTreeSet::new();
        for (role, pin, expected) in roles {
            if let Some(direction) = pin.direction {
                if direction != expected {
                    return invalid(format!(
                        "{} (GPIO{}) must be direction '{}'",
                        role,
                        pin.pin,
                        if expected == PinDirection::Out { "out" } else { "in" }
                    ));
                }
            }
            if !seen.insert(pin.pin) {
                return invalid(format!("GPIO{} assigned to more than one line", pin.pin));
            }
        }

        // A low CE at startup would select every chip on the bus
        if self.ce.initial == Some(false) {
            return invalid(format!("ce (GPIO{}) must start high", self.ce.pin));
        }

        if let Some(addr) = self.sim_devices.iter().find(|&&a| a > 7) {
            return invalid(format!("simulated device address {} out of range 0-7", addr));
        }
        Ok(())
    }

    /// Addressing mode selected by `bank`
    pub fn addressing_mode(&self) -> AddressingMode {
        if self.bank == 0 {
            AddressingMode::Bank0
        } else {
            AddressingMode::Bank1
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

fn deserialize_hex_u8<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let n = deserialize_hex_u32(deserializer)?;
    u8::try_from(n).map_err(|_| serde::de::Error::custom(format!("value {} out of range", n)))
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex number '{}': {}", s, e))
    } else {
        s.parse()
            .map_err(|e| format!("Invalid number '{}': {}", s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExpanderConfig::default();
        assert_eq!(config.reset.pin, 27);
        assert_eq!(config.int_a.pin, 23);
        assert_eq!(config.int_b.pin, 24);
        assert_eq!(config.ce.pin, 13);
        assert_eq!(config.spi_bus, 1);
        assert_eq!(config.spi_speed_hz, 1_000_000);
        assert_eq!(config.sim_devices, vec![0]);
        assert!(config.validate().is_ok());
        assert_eq!(config.addressing_mode(), AddressingMode::Bank0);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(
            ExpanderConfig::from_toml_str("").unwrap(),
            ExpanderConfig::default()
        );
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
gpio_chip = "gpiochip4"
spi_bus = 0
spi_mode = "0x3"
spi_speed_hz = "0x7A120"
bank = 1
sim_devices = [1, 4]
colour = "blue"

[ce]
pin = "0x08"
direction = "out"

[reset]
pin = 17
initial = false
"#;
        let config = ExpanderConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.gpio_chip, "gpiochip4");
        assert_eq!(config.spi_bus, 0);
        assert_eq!(config.spi_mode, 3);
        assert_eq!(config.spi_speed_hz, 500_000);
        assert_eq!(config.addressing_mode(), AddressingMode::Bank1);
        assert_eq!(config.sim_devices, vec![1, 4]);
        assert_eq!(config.ce.pin, 8);
        assert!(config.ce.initial_level());
        assert_eq!(config.reset.pin, 17);
        assert!(!config.reset.initial_level());
        // Untouched sections keep their defaults
        assert_eq!(config.int_a.pin, 23);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ExpanderConfig::from_toml_str("spi_bus = 300"),
            Err(PlatformError::ConfigParse(_))
        ));
        assert!(matches!(
            ExpanderConfig::from_toml_str("spi_speed_hz = \"fast\""),
            Err(PlatformError::ConfigParse(_))
        ));
        assert!(matches!(
            ExpanderConfig::from_toml_str("[ce]\ndirection = \"sideways\"\npin = 1"),
            Err(PlatformError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validate() {
        let bad = |f: fn(&mut ExpanderConfig)| {
            let mut config = ExpanderConfig::default();
            f(&mut config);
            matches!(config.validate(), Err(PlatformError::InvalidConfig(_)))
        };
        assert!(bad(|c| c.spi_mode = 4));
        assert!(bad(|c| c.spi_speed_hz = 0));
        assert!(bad(|c| c.bank = 2));
        assert!(bad(|c| c.reset.direction = Some(PinDirection::In)));
        assert!(bad(|c| c.int_b.direction = Some(PinDirection::Out)));
        assert!(bad(|c| c.int_a.pin = 13));
        assert!(bad(|c| c.sim_devices = vec![0, 8]));
        assert!(bad(|c| c.ce.initial = Some(false)));
        assert!(!bad(|c| c.ce.initial = Some(true)));
        assert!(!bad(|c| c.ce.direction = None));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcpio.toml");
        fs::write(&path, "[reset]\npin = 17\n").unwrap();
        let config = ExpanderConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.reset.pin, 17);
        assert_eq!(config.reset.direction, None);

        assert!(matches!(
            ExpanderConfig::from_toml_file(&dir.path().join("missing.toml")),
            Err(PlatformError::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x1F"), Ok(31));
        assert_eq!(parse_number(" 42 "), Ok(42));
        assert!(parse_number("0xZZ").is_err());
    }
}
