//! SPI chip-select assignments from the device tree
//!
//! On a Raspberry Pi every SPI controller is a `spi@<address>` node below
//! `/proc/device-tree/soc`. When chip selects are routed to GPIOs the node
//! carries a `cs-gpios` property: a list of `<phandle gpio flags>`
//! specifiers, each cell a big-endian u32.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PlatformError, Result};

/// Default location of the SoC node
pub const DEVICE_TREE_SOC: &str = "/proc/device-tree/soc";

/// Bytes per `cs-gpios` specifier (three cells)
const CS_GPIO_ENTRY_LEN: usize = 12;

/// Known BCM283x/BCM2711 SPI controller nodes
const SPI_NODE_TO_BUS: [(&str, &str); 3] = [
    ("spi@7e204000", "SPI0"),
    ("spi@7e215080", "SPI1"),
    ("spi@7e2150c0", "SPI2"),
];

/// One chip-select line of an SPI controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipSelect {
    /// Chip select routed to a GPIO
    Gpio {
        /// GPIO number
        gpio: u32,
        /// Specifier flags (active level)
        flags: u32,
        /// Phandle of the GPIO controller
        phandle: u32,
    },
    /// No `cs-gpios` property; the controller's native CE0/CE1 pins apply
    Native,
}

impl fmt::Display for ChipSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio { gpio, flags, .. } => write!(f, "GPIO{} (flags 0x{:X})", gpio, flags),
            Self::Native => write!(f, "native CE0/CE1"),
        }
    }
}

/// Chip selects per SPI bus name (`SPI0`, `SPI1`, or the raw node name)
pub type SpiChipSelects = BTreeMap<String, Vec<ChipSelect>>;

/// Bus name for a device-tree node name
pub fn bus_name(node: &str) -> String {
    SPI_NODE_TO_BUS
        .iter()
        .find(|(n, _)| *n == node)
        .map(|(_, bus)| bus.to_string())
        .unwrap_or_else(|| node.to_string())
}

/// Decode a `cs-gpios` property
///
/// The GPIO number is the low byte of the second cell. A trailing partial
/// specifier is ignored.
pub fn parse_cs_gpios(data: &[u8]) -> Vec<ChipSelect> {
    data.chunks_exact(CS_GPIO_ENTRY_LEN)
        .map(|entry| {
            let cell = |i: usize| {
                u32::from_be_bytes([entry[i], entry[i + 1], entry[i + 2], entry[i + 3]])
            };
            ChipSelect::Gpio {
                phandle: cell(0),
                gpio: cell(4) & 0xFF,
                flags: cell(8),
            }
        })
        .collect()
}

/// Read chip-select assignments from the running system
pub fn read_spi_chip_selects() -> Result<SpiChipSelects> {
    read_spi_chip_selects_at(Path::new(DEVICE_TREE_SOC))
}

/// Read chip-select assignments below the given SoC node
pub fn read_spi_chip_selects_at(soc: &Path) -> Result<SpiChipSelects> {
    if !soc.is_dir() {
        return Err(PlatformError::DeviceTreeMissing(soc.to_path_buf()));
    }
    let read_err = |path: &Path, source: io::Error| PlatformError::DeviceTreeRead {
        path: path.to_path_buf(),
        source,
    };

    let mut result = SpiChipSelects::new();
    for entry in fs::read_dir(soc).map_err(|e| read_err(soc, e))? {
        let entry = entry.map_err(|e| read_err(soc, e))?;
        let node = entry.file_name().to_string_lossy().into_owned();
        if !node.starts_with("spi@") {
            continue;
        }

        let property = entry.path().join("cs-gpios");
        let selects = match fs::read(&property) {
            Ok(data) => parse_cs_gpios(&data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => vec![ChipSelect::Native],
            Err(e) => return Err(read_err(&property, e)),
        };
        log::debug!("devicetree: {} ({}): {:?}", node, bus_name(&node), selects);
        result.insert(bus_name(&node), selects);
    }
    Ok(result)
}

/// Fixed assignments used when no device tree is available
pub fn simulated_chip_selects() -> SpiChipSelects {
    let mut table = SpiChipSelects::new();
    table.insert("SPI0".into(), Vec::new());
    table.insert(
        "SPI1".into(),
        vec![ChipSelect::Gpio {
            gpio: 13,
            flags: 0,
            phandle: 7,
        }],
    );
    table.insert("SPI2".into(), vec![ChipSelect::Native]);
    table
}

/// Check that SPI bus `bus` uses GPIO `ce` as its first chip select
pub fn validate_chip_select(table: &SpiChipSelects, bus: u8, ce: u32) -> Result<()> {
    let name = format!("SPI{}", bus);
    let selects = table
        .get(&name)
        .ok_or_else(|| PlatformError::BusNotFound(name.clone()))?;
    match selects.first() {
        Some(ChipSelect::Gpio { gpio, .. }) if *gpio == ce => {
            log::debug!("devicetree: GPIO{} assigned for {} CE", gpio, name);
            Ok(())
        }
        Some(ChipSelect::Gpio { gpio, .. }) => Err(PlatformError::ChipSelectMismatch {
            bus: name,
            found: *gpio,
            configured: ce,
        }),
        Some(ChipSelect::Native) | None => Err(PlatformError::NoChipSelect(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs_entry(phandle: u32, gpio: u32, flags: u32) -> Vec<u8> {
        [phandle, gpio, flags]
            .iter()
            .flat_map(|c| c.to_be_bytes())
            .collect()
    }

    #[test]
    fn test_bus_name() {
        assert_eq!(bus_name("spi@7e215080"), "SPI1");
        assert_eq!(bus_name("spi@7e204600"), "spi@7e204600");
    }

    #[test]
    fn test_parse_cs_gpios() {
        let mut data = cs_entry(7, 13, 1);
        data.extend(cs_entry(7, 0x0112, 0));
        data.extend([0, 0, 0]);
        assert_eq!(
            parse_cs_gpios(&data),
            vec![
                ChipSelect::Gpio {
                    gpio: 13,
                    flags: 1,
                    phandle: 7
                },
                ChipSelect::Gpio {
                    gpio: 0x12,
                    flags: 0,
                    phandle: 7
                },
            ]
        );
        assert!(parse_cs_gpios(&[]).is_empty());
    }

    #[test]
    fn test_read_device_tree() {
        let dir = tempfile::tempdir().unwrap();
        let soc = dir.path().join("soc");
        fs::create_dir_all(soc.join("spi@7e215080")).unwrap();
        fs::write(soc.join("spi@7e215080/cs-gpios"), cs_entry(7, 13, 1)).unwrap();
        fs::create_dir_all(soc.join("spi@7e204000")).unwrap();
        fs::create_dir_all(soc.join("gpio@7e200000")).unwrap();

        let table = read_spi_chip_selects_at(&soc).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["SPI0"], vec![ChipSelect::Native]);
        assert!(validate_chip_select(&table, 1, 13).is_ok());
    }

    #[test]
    fn test_missing_device_tree() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_spi_chip_selects_at(&dir.path().join("soc")),
            Err(PlatformError::DeviceTreeMissing(_))
        ));
    }

    #[test]
    fn test_validate_chip_select() {
        let table = simulated_chip_selects();
        assert!(validate_chip_select(&table, 1, 13).is_ok());
        assert!(matches!(
            validate_chip_select(&table, 1, 8),
            Err(PlatformError::ChipSelectMismatch {
                found: 13,
                configured: 8,
                ..
            })
        ));
        assert!(matches!(
            validate_chip_select(&table, 0, 13),
            Err(PlatformError::NoChipSelect(_))
        ));
        assert!(matches!(
            validate_chip_select(&table, 2, 13),
            Err(PlatformError::NoChipSelect(_))
        ));
        assert!(matches!(
            validate_chip_select(&table, 3, 13),
            Err(PlatformError::BusNotFound(_))
        ));
    }
}
