//! Backend-independent expander handle

use mcpio_core::hal::{Delay, InputLine, OutputLine, SpiBus};
use mcpio_core::{Mcp23s17, SharedExpander};
use mcpio_sim::Simulator;

use crate::registry::Backend;

/// SPI bus of any backend
pub type BoxedSpi = Box<dyn SpiBus + Send>;
/// Output line of any backend
pub type BoxedOutput = Box<dyn OutputLine + Send>;
/// Input line of any backend
pub type BoxedInput = Box<dyn InputLine + Send>;
/// Delay provider of any backend
pub type BoxedDelay = Box<dyn Delay + Send>;

/// Driver type produced by [`crate::open_expander`]
pub type Expander = Mcp23s17<BoxedSpi, BoxedOutput, BoxedOutput, BoxedDelay, BoxedInput>;

/// An opened expander chain
///
/// Wraps the driver together with the backend that was chosen, so callers
/// never see the concrete SPI or GPIO types.
pub struct ExpanderHandle {
    driver: Expander,
    backend: Backend,
    simulator: Option<Simulator>,
}

impl ExpanderHandle {
    pub(crate) fn new(driver: Expander, backend: Backend, simulator: Option<Simulator>) -> Self {
        Self {
            driver,
            backend,
            simulator,
        }
    }

    /// The driver
    pub fn driver(&mut self) -> &mut Expander {
        &mut self.driver
    }

    /// Backend actually in use (never [`Backend::Auto`])
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Simulated chain behind the driver, for the simulated backend
    pub fn simulator(&self) -> Option<&Simulator> {
        self.simulator.as_ref()
    }

    /// Convert into a handle that can be shared between threads
    pub fn into_shared(
        self,
    ) -> SharedExpander<BoxedSpi, BoxedOutput, BoxedOutput, BoxedDelay, BoxedInput> {
        SharedExpander::new(self.driver)
    }
}

impl std::fmt::Debug for ExpanderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpanderHandle")
            .field("backend", &self.backend)
            .field("mode", &self.driver.mode())
            .field("devices", &self.driver.devices())
            .finish()
    }
}
