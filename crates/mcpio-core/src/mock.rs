//! Recording bus, line and delay doubles for unit tests

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use crate::error::{ControlLine, Error, Result};
use crate::hal::{Delay, InputLine, OutputLine, SpiBus};

/// Something observable on the wires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A control line was driven
    Line(ControlLine, bool),
    /// Bytes clocked out on the bus
    Transfer(Vec<u8>),
    /// Blocking delay
    Delay(u32),
}

/// Data phase responder: `(header, buffer)` for each transfer after the header
pub type Responder = Box<dyn FnMut([u8; 2], &mut [u8])>;

/// Shared wiring between the doubles of one test
#[derive(Clone, Default)]
pub struct Wires {
    events: Rc<RefCell<Vec<Event>>>,
    frame: Rc<Cell<u32>>,
}

impl Wires {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Levels driven on one control line, in order
    pub fn line_writes(&self, line: ControlLine) -> Vec<bool> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Line(l, level) if *l == line => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Transfer(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn bus(&self) -> MockBus {
        MockBus {
            wires: self.clone(),
            seen_frame: 0,
            header: None,
            responder: None,
            fail: false,
        }
    }

    pub fn line(&self, line: ControlLine, initial: bool) -> MockLine {
        MockLine {
            wires: self.clone(),
            line,
            level: initial,
            stuck: None,
            read_fails: false,
        }
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            wires: self.clone(),
        }
    }
}

pub struct MockBus {
    wires: Wires,
    seen_frame: u32,
    header: Option<[u8; 2]>,
    responder: Option<Responder>,
    fail: bool,
}

impl MockBus {
    pub fn with_responder(mut self, responder: impl FnMut([u8; 2], &mut [u8]) + 'static) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl SpiBus for MockBus {
    fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(Error::BusTransferFailed);
        }
        self.wires
            .events
            .borrow_mut()
            .push(Event::Transfer(buf.to_vec()));

        let frame = self.wires.frame.get();
        if frame != self.seen_frame && buf.len() == 2 {
            // First transfer after CE went low carries the header
            self.seen_frame = frame;
            self.header = Some([buf[0], buf[1]]);
            buf.fill(0);
            return Ok(());
        }

        match (self.header, self.responder.as_mut()) {
            (Some(header), Some(responder)) => responder(header, buf),
            _ => buf.fill(0),
        }
        Ok(())
    }
}

pub struct MockLine {
    wires: Wires,
    line: ControlLine,
    level: bool,
    stuck: Option<bool>,
    read_fails: bool,
}

impl MockLine {
    /// Make the line read back `level` regardless of what is driven
    pub fn stuck_at(mut self, level: bool) -> Self {
        self.stuck = Some(level);
        self
    }

    /// Make every readback fail while writes still take effect
    pub fn failing_reads(mut self) -> Self {
        self.read_fails = true;
        self
    }
}

impl MockLine {
    fn level(&self) -> Result<bool> {
        if self.read_fails {
            return Err(Error::LineIoFailed);
        }
        Ok(self.stuck.unwrap_or(self.level))
    }
}

impl OutputLine for MockLine {
    fn write(&mut self, high: bool) -> Result<()> {
        self.wires
            .events
            .borrow_mut()
            .push(Event::Line(self.line, high));
        if self.line == ControlLine::ChipEnable && self.level && !high {
            self.wires.frame.set(self.wires.frame.get() + 1);
        }
        self.level = high;
        Ok(())
    }

    fn read(&mut self) -> Result<bool> {
        self.level()
    }
}

impl InputLine for MockLine {
    fn read(&mut self) -> Result<bool> {
        self.level()
    }
}

pub struct MockDelay {
    wires: Wires,
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.wires.events.borrow_mut().push(Event::Delay(ms));
    }
}

/// Input line held at a fixed level
pub struct MockInput(pub bool);

impl InputLine for MockInput {
    fn read(&mut self) -> Result<bool> {
        Ok(self.0)
    }
}
