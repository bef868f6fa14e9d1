//! Driver shared between several callers
//!
//! The lock is held for the whole open, transfer and close sequence so
//! transactions from different callers never interleave on the bus.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::device::{Mcp23s17, NoLine};
use crate::devices::DeviceAddressSet;
use crate::error::Result;
use crate::hal::{Delay, InputLine, OutputLine, SpiBus};
use crate::protocol::{Direction, RegisterRef};
use crate::session::Transaction;

/// Cloneable handle to a driver behind a mutex
pub struct SharedExpander<S, C, R, D, I = NoLine> {
    inner: Arc<Mutex<Mcp23s17<S, C, R, D, I>>>,
}

impl<S, C, R, D, I> Clone for SharedExpander<S, C, R, D, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C, R, D, I> SharedExpander<S, C, R, D, I>
where
    S: SpiBus,
    C: OutputLine,
    R: OutputLine,
    D: Delay,
    I: InputLine,
{
    /// Wrap a driver
    pub fn new(driver: Mcp23s17<S, C, R, D, I>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(driver)),
        }
    }

    // A panic while holding the lock leaves at worst an open session;
    // the next open closes it first.
    fn lock(&self) -> MutexGuard<'_, Mcp23s17<S, C, R, D, I>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on an open transaction, holding the lock until it is closed
    pub fn with_transaction<T>(
        &self,
        address: u8,
        register: impl Into<RegisterRef>,
        direction: Direction,
        f: impl FnOnce(&mut Transaction<'_, S, C>) -> Result<T>,
    ) -> Result<T> {
        let mut driver = self.lock();
        let mut tx = driver.transaction(address, register, direction)?;
        let value = f(&mut tx)?;
        tx.finish()?;
        Ok(value)
    }

    /// Run `f` with exclusive access to the driver
    pub fn with_driver<T>(&self, f: impl FnOnce(&mut Mcp23s17<S, C, R, D, I>) -> T) -> T {
        f(&mut self.lock())
    }

    /// Read one register
    pub fn read_register(&self, address: u8, register: impl Into<RegisterRef>) -> Result<u8> {
        self.lock().read_register(address, register)
    }

    /// Write one register
    pub fn write_register(
        &self,
        address: u8,
        register: impl Into<RegisterRef>,
        value: u8,
    ) -> Result<()> {
        self.lock().write_register(address, register, value)
    }

    /// Devices found by the last enumeration
    pub fn devices(&self) -> DeviceAddressSet {
        self.lock().devices()
    }

    /// Unwrap the driver if this is the last handle
    pub fn try_unwrap(self) -> core::result::Result<Mcp23s17<S, C, R, D, I>, Self> {
        Arc::try_unwrap(self.inner)
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|inner| Self { inner })
    }
}
