//! RESET line sequencing
//!
//! All chained expanders share one active-low RESET line. A reset pulse
//! returns every register to its power-on value, which also clears `HAEN`
//! and `BANK`.

use crate::error::{ControlLine, Error, Result};
use crate::hal::{Delay, OutputLine};

/// Time the RESET line is held at each level
pub const RESET_HOLD_MS: u32 = 100;

/// Drives the shared RESET line
pub struct ResetSequencer<R, D> {
    line: R,
    delay: D,
}

impl<R: OutputLine, D: Delay> ResetSequencer<R, D> {
    /// Take ownership of the RESET line and a delay provider
    pub fn new(line: R, delay: D) -> Self {
        Self { line, delay }
    }

    /// Pulse RESET low then high, verifying the line after each hold
    ///
    /// Blocks for twice [`RESET_HOLD_MS`]. A line that does not read back
    /// the driven level is a wiring fault and is reported immediately,
    /// without retry and without further delay.
    pub fn pulse(&mut self) -> Result<()> {
        self.hold(false)?;
        self.hold(true)?;
        log::info!("mcp23s17: devices reset");
        Ok(())
    }

    /// Give back the line and delay provider
    pub fn release(self) -> (R, D) {
        (self.line, self.delay)
    }

    fn hold(&mut self, high: bool) -> Result<()> {
        self.line.write(high)?;
        self.delay.delay_ms(RESET_HOLD_MS);
        if self.line.read()? != high {
            log::error!(
                "mcp23s17: RESET line did not go {}",
                if high { "high" } else { "low" }
            );
            return Err(Error::LineVerifyFailed {
                line: ControlLine::Reset,
                expected: high,
            });
        }
        Ok(())
    }
}
