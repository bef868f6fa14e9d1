//! Platform capability detection

use std::fmt;
use std::fs;

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const MODEL_PATH: &str = "/proc/device-tree/model";
const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Platform the program runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Raspberry Pi with SPI and GPIO character devices
    RaspberryPi,
    /// Other Linux system
    Linux,
    /// Windows
    Windows,
    /// Anything else
    Unknown,
}

impl Platform {
    /// Whether real SPI and GPIO hardware can be expected
    pub fn has_expander_hardware(self) -> bool {
        self == Self::RaspberryPi
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RaspberryPi => write!(f, "Raspberry Pi"),
            Self::Linux => write!(f, "Linux"),
            Self::Windows => write!(f, "Windows"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Detect the current platform
pub fn detect() -> Platform {
    if cfg!(windows) {
        Platform::Windows
    } else if cfg!(target_os = "linux") {
        if is_raspberry_pi() {
            Platform::RaspberryPi
        } else {
            Platform::Linux
        }
    } else {
        Platform::Unknown
    }
}

/// Probe hostname, device-tree model and cpuinfo for a Raspberry Pi
pub fn is_raspberry_pi() -> bool {
    let hostname = fs::read_to_string(HOSTNAME_PATH).ok();
    let model = fs::read_to_string(MODEL_PATH).ok();
    let cpuinfo = fs::read_to_string(CPUINFO_PATH).ok();
    let found = looks_like_raspberry_pi(hostname.as_deref(), model.as_deref(), cpuinfo.as_deref());
    log::debug!("platform: Raspberry Pi detected: {}", found);
    found
}

/// Raspberry Pi test on already-read identification sources
///
/// Any one of these is enough: hostname containing `raspberrypi` (any
/// case), a device-tree model containing `Raspberry Pi`, or a cpuinfo
/// `Hardware` line naming a `BCM` SoC.
pub fn looks_like_raspberry_pi(
    hostname: Option<&str>,
    model: Option<&str>,
    cpuinfo: Option<&str>,
) -> bool {
    if hostname.is_some_and(|h| h.to_lowercase().contains("raspberrypi")) {
        return true;
    }
    if model.is_some_and(|m| m.contains("Raspberry Pi")) {
        return true;
    }
    cpuinfo.is_some_and(|info| {
        info.lines()
            .any(|line| line.starts_with("Hardware") && line.contains("BCM"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname() {
        assert!(looks_like_raspberry_pi(Some("RaspberryPi-lab\n"), None, None));
        assert!(!looks_like_raspberry_pi(Some("buildhost"), None, None));
    }

    #[test]
    fn test_model() {
        // Device-tree strings are NUL terminated
        assert!(looks_like_raspberry_pi(
            None,
            Some("Raspberry Pi 4 Model B Rev 1.4\0"),
            None
        ));
        assert!(!looks_like_raspberry_pi(None, Some("Pine64 RockPro64\0"), None));
    }

    #[test]
    fn test_cpuinfo() {
        let info = "processor\t: 0\nHardware\t: BCM2835\nRevision\t: c03114\n";
        assert!(looks_like_raspberry_pi(None, None, Some(info)));
        let info = "processor\t: 0\nmodel name\t: BCM imitation\n";
        assert!(!looks_like_raspberry_pi(None, None, Some(info)));
    }

    #[test]
    fn test_nothing_readable() {
        assert!(!looks_like_raspberry_pi(None, None, None));
    }

    #[test]
    fn test_display() {
        assert_eq!(Platform::RaspberryPi.to_string(), "Raspberry Pi");
        assert!(Platform::RaspberryPi.has_expander_hardware());
        assert!(!Platform::Linux.has_expander_hardware());
    }
}
