//! Bus, line and delay traits
//!
//! Adapters for real hardware live in `mcpio-linux-spi` and
//! `mcpio-linux-gpio`, simulated ones in `mcpio-sim`.
//!
//! ## Line direction
//!
//! A GPIO line's direction is fixed when it is acquired. Output lines
//! implement [`OutputLine`] and can be read back for electrical
//! verification; input lines only implement [`InputLine`], so writing to an
//! input is rejected at compile time. Releasing a line is done by dropping it.

use crate::error::Result;

/// Full-duplex SPI bus transfer primitive
pub trait SpiBus {
    /// Clock out `buf` and replace its contents with the received bytes
    ///
    /// The transfer is blocking and always exchanges exactly `buf.len()`
    /// bytes. Chip-select framing is not handled here.
    fn transfer(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// GPIO line acquired as an output
pub trait OutputLine {
    /// Drive the line (`true` = high)
    fn write(&mut self, high: bool) -> Result<()>;

    /// Read back the electrical level of the line
    fn read(&mut self) -> Result<bool>;
}

/// GPIO line acquired as an input
pub trait InputLine {
    /// Read the level of the line (`true` = high)
    fn read(&mut self) -> Result<bool>;
}

/// Blocking delay
pub trait Delay {
    /// Block for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

impl<T: SpiBus + ?Sized> SpiBus for &mut T {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).transfer(buf)
    }
}

impl<T: OutputLine + ?Sized> OutputLine for &mut T {
    fn write(&mut self, high: bool) -> Result<()> {
        (**self).write(high)
    }

    fn read(&mut self) -> Result<bool> {
        (**self).read()
    }
}

impl<T: InputLine + ?Sized> InputLine for &mut T {
    fn read(&mut self) -> Result<bool> {
        (**self).read()
    }
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

#[cfg(feature = "std")]
mod boxed {
    use super::*;
    use std::boxed::Box;

    impl<T: SpiBus + ?Sized> SpiBus for Box<T> {
        fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
            (**self).transfer(buf)
        }
    }

    impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
        fn write(&mut self, high: bool) -> Result<()> {
            (**self).write(high)
        }

        fn read(&mut self) -> Result<bool> {
            (**self).read()
        }
    }

    impl<T: InputLine + ?Sized> InputLine for Box<T> {
        fn read(&mut self) -> Result<bool> {
            (**self).read()
        }
    }

    impl<T: Delay + ?Sized> Delay for Box<T> {
        fn delay_ms(&mut self, ms: u32) {
            (**self).delay_ms(ms)
        }
    }
}

/// Delay backed by `std::thread::sleep`
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(feature = "std")]
impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
