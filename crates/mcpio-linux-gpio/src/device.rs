//! Linux GPIO line implementation
//!
//! This module provides `GpioOutput` and `GpioInput`, single GPIO lines
//! requested through Linux's GPIO character device interface (gpiocdev).
//! The line direction is fixed when the line is requested; dropping the
//! value releases the line.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use mcpio_core::error::{Error as CoreError, Result as CoreResult};
use mcpio_core::hal::{InputLine, OutputLine};

/// Consumer label shown by `gpioinfo` for requested lines
pub const CONSUMER: &str = "mcpio";

/// Resolve a GPIO chip given as a path, a name (`gpiochip0`) or a number
pub fn chip_path(chip: &str) -> Result<String> {
    let chip = chip.trim();
    if chip.is_empty() {
        return Err(LinuxGpioError::NoDevice);
    }
    if chip.starts_with('/') {
        return Ok(chip.to_string());
    }
    if chip.starts_with("gpiochip") {
        return Ok(format!("/dev/{}", chip));
    }
    let n: u32 = chip
        .parse()
        .map_err(|_| LinuxGpioError::InvalidParameter(format!("GPIO chip '{}'", chip)))?;
    Ok(format!("/dev/gpiochip{}", n))
}

fn to_value(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

fn request_line(chip: &str, offset: Offset, config: Config) -> Result<Request> {
    let path = chip_path(chip)?;
    Request::from_config(config)
        .on_chip(&path)
        .with_consumer(CONSUMER)
        .request()
        .map_err(|source| LinuxGpioError::LineRequestFailed {
            chip: path,
            offset,
            source,
        })
}

/// GPIO line requested as an output
pub struct GpioOutput {
    request: Request,
    offset: Offset,
}

impl GpioOutput {
    /// Request `offset` on `chip` as an output driven to `initial`
    pub fn request(chip: &str, offset: Offset, initial: bool) -> Result<Self> {
        let mut config = Config::default();
        config.with_line(offset).as_output(to_value(initial));
        let request = request_line(chip, offset, config)?;
        log::debug!(
            "linux_gpio: line {} on {} as output (initial {})",
            offset,
            chip,
            if initial { "high" } else { "low" }
        );
        Ok(Self { request, offset })
    }

    /// Line offset on its chip
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Drive the line
    pub fn set(&self, high: bool) -> Result<()> {
        self.request
            .set_value(self.offset, to_value(high))
            .map_err(LinuxGpioError::SetValueFailed)
    }

    /// Read the line back
    pub fn get(&self) -> Result<bool> {
        self.request
            .value(self.offset)
            .map(|v| v == Value::Active)
            .map_err(LinuxGpioError::GetValueFailed)
    }
}

impl OutputLine for GpioOutput {
    fn write(&mut self, high: bool) -> CoreResult<()> {
        self.set(high).map_err(|e| {
            log::error!("linux_gpio: line {}: {}", self.offset, e);
            CoreError::LineIoFailed
        })
    }

    fn read(&mut self) -> CoreResult<bool> {
        self.get().map_err(|e| {
            log::error!("linux_gpio: line {}: {}", self.offset, e);
            CoreError::LineIoFailed
        })
    }
}

/// GPIO line requested as an input
pub struct GpioInput {
    request: Request,
    offset: Offset,
}

impl GpioInput {
    /// Request `offset` on `chip` as an input
    pub fn request(chip: &str, offset: Offset) -> Result<Self> {
        let mut config = Config::default();
        config.with_line(offset).as_input();
        let request = request_line(chip, offset, config)?;
        log::debug!("linux_gpio: line {} on {} as input", offset, chip);
        Ok(Self { request, offset })
    }

    /// Line offset on its chip
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Read the line
    pub fn get(&self) -> Result<bool> {
        self.request
            .value(self.offset)
            .map(|v| v == Value::Active)
            .map_err(LinuxGpioError::GetValueFailed)
    }
}

impl InputLine for GpioInput {
    fn read(&mut self) -> CoreResult<bool> {
        self.get().map_err(|e| {
            log::error!("linux_gpio: line {}: {}", self.offset, e);
            CoreError::LineIoFailed
        })
    }
}
