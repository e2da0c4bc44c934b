//! Interrupt line and its control register.
//!
//! The line is asserted only on an explicit driver request through
//! [`crate::regs::REG_IRQ_CTRL`]; DMA completion does not auto-fire it. The
//! handler's contract is to observe the sticky pending bit, react, and
//! acknowledge; an unacknowledged line stays asserted indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::regs::irq_ctrl;

#[derive(Debug, Default)]
struct LineState {
    asserted: AtomicBool,
    pending: AtomicBool,
}

/// A cheaply cloneable handle to the device's interrupt line.
///
/// The device holds one clone and mutates it from register writes; the
/// driver's handler (and tests probing for stuck interrupts) observe through
/// their own clones without taking the device lock.
#[derive(Debug, Clone, Default)]
pub struct IrqLine {
    state: Arc<LineState>,
}

impl IrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the interrupt pending and asserts the line.
    pub fn request_assert(&self) {
        self.state.pending.store(true, Ordering::SeqCst);
        self.state.asserted.store(true, Ordering::SeqCst);
        trace!("irq line asserted");
    }

    /// Clears the pending bit and deasserts the line.
    pub fn acknowledge(&self) {
        self.state.pending.store(false, Ordering::SeqCst);
        self.state.asserted.store(false, Ordering::SeqCst);
        trace!("irq line acknowledged");
    }

    /// Whether this device is currently requesting attention. Handlers use
    /// this to decide whether this device caused a (possibly shared)
    /// interrupt.
    pub fn pending(&self) -> bool {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// The electrical state of the line.
    pub fn asserted(&self) -> bool {
        self.state.asserted.load(Ordering::SeqCst)
    }
}

/// Register-facing wrapper: the IRQ_CTRL slot semantics on top of a line.
#[derive(Debug, Default)]
pub struct IrqCtrl {
    line: IrqLine,
    /// Last written value; echoed on read except for bit0.
    shadow: u32,
}

impl IrqCtrl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the underlying line for handlers and tests.
    pub fn line(&self) -> IrqLine {
        self.line.clone()
    }

    /// Bit0 of the readback reflects the sticky pending bit; the remaining
    /// bits echo the last written value.
    pub fn reg_read(&self) -> u32 {
        (self.shadow & !irq_ctrl::ASSERT) | u32::from(self.line.pending())
    }

    pub fn reg_write(&mut self, value: u32) {
        // Assert wins if both bits are set, matching the original device.
        if value & irq_ctrl::ASSERT != 0 {
            self.line.request_assert();
        } else if value & irq_ctrl::ACK != 0 {
            self.line.acknowledge();
        }
        self.shadow = value;
    }
}
