//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the `SpiBus`
//! trait using Linux's spidev interface.

use crate::error::{LinuxSpiError, Result};

use mcpio_core::error::{Error as CoreError, Result as CoreResult};
use mcpio_core::hal::SpiBus;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default SPI clock speed in Hz (1 MHz)
pub const DEFAULT_SPEED_HZ: u32 = 1_000_000;

/// Highest clock the MCP23S17 supports (10 MHz)
pub const MAX_SPEED_HZ: u32 = 10_000_000;

/// Highest SPI mode number (CPOL=1, CPHA=1)
pub const MAX_MODE: u8 = 3;

/// Word size; the MCP23S17 protocol is byte oriented
const BITS_PER_WORD: u8 = 8;

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    // SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])

    /// Size of struct spi_ioc_transfer (same on 32-bit and 64-bit)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr), _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev1.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 1 MHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: 0,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Configuration for chip select 0 of SPI bus `bus`
    ///
    /// The expanders' CE is a plain GPIO, so the spidev chip select is
    /// never wired to them and CS 0 is always used.
    pub fn for_bus(bus: u8) -> Self {
        Self::new(format!("/dev/spidev{}.0", bus))
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Check the parameters before touching the device
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }
        if self.mode > MAX_MODE {
            return Err(LinuxSpiError::InvalidMode(self.mode));
        }
        if self.speed_hz == 0 {
            return Err(LinuxSpiError::InvalidSpeed);
        }
        if self.speed_hz > MAX_SPEED_HZ {
            log::warn!(
                "linux_spi: {} Hz exceeds the MCP23S17 limit of {} Hz",
                self.speed_hz,
                MAX_SPEED_HZ
            );
        }
        Ok(())
    }
}

/// SPI bus using the spidev interface
///
/// Transfers are full duplex: the same buffer is used for transmit and
/// receive.
pub struct LinuxSpi {
    /// File handle for spidev device
    file: File,
    /// Device path, for diagnostics
    device: String,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Clock used for every transfer
    speed_hz: u32,
}

impl LinuxSpi {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        config.validate()?;

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();
        let configure_failed = |setting: &'static str, value: u32| {
            let device = config.device.clone();
            move |e: nix::errno::Errno| LinuxSpiError::ConfigureFailed {
                device,
                setting,
                value,
                source: std::io::Error::from_raw_os_error(e as i32),
            }
        };

        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(configure_failed("mode", mode as u32))?;
        }

        let bits = BITS_PER_WORD;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits)
                .map_err(configure_failed("bits per word", bits as u32))?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed)
                .map_err(configure_failed("max speed", speed))?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz)",
            config.device,
            mode,
            speed / 1000
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file,
            device: config.device.clone(),
            max_kernel_buf_size,
            speed_hz: speed,
        })
    }

    /// Perform one full-duplex SPI_IOC_MESSAGE(1) transfer
    fn spi_transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let transfer = SpiIocTransfer {
            tx_buf: buf.as_ptr() as u64,
            rx_buf: buf.as_mut_ptr() as u64,
            len: buf.len() as u32,
            speed_hz: self.speed_hz,
            bits_per_word: BITS_PER_WORD,
            ..Default::default()
        };

        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed {
                len: buf.len(),
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(())
    }
}

impl SpiBus for LinuxSpi {
    fn transfer(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        // Chip enable is a separate GPIO, so splitting at the kernel buffer
        // size does not break the transaction.
        for chunk in buf.chunks_mut(self.max_kernel_buf_size.max(1)) {
            self.spi_transfer(chunk).map_err(|e| {
                log::error!("linux_spi: {}: {}", self.device, e);
                CoreError::BusTransferFailed
            })?;
        }
        Ok(())
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Some(size) = parse_buf_size(&content) {
            log::debug!("linux_spi: Using buffer size {} from sysfs", size);
            return size;
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

fn parse_buf_size(content: &str) -> Option<usize> {
    content.trim().parse::<usize>().ok().filter(|&size| size > 0)
}
