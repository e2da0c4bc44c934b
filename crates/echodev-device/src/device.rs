//! The composed echo device: register file + DMA engine + interrupt line +
//! local data memory, one addressable instance.

use echodev_memory::HostMemory;
use thiserror::Error;

use crate::bar0::RegisterBank;
use crate::bar1::LocalMemory;
use crate::dma::DmaEngine;
use crate::irq::{IrqCtrl, IrqLine};
use crate::regs;

/// Non-fatal BAR0 access failures. The device state is untouched when one of
/// these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("register offset 0x{offset:x} beyond the {size}-byte BAR0 window")]
    OutOfRange { offset: u64, size: u64 },
    #[error("register offset 0x{offset:x} is not 4-byte aligned")]
    Misaligned { offset: u64 },
}

// The DMA descriptor slots: DMA_SRC through the high half of DMA_CMD.
const DMA_REG_FIRST: u64 = regs::REG_DMA_SRC;
const DMA_REG_LAST: u64 = regs::REG_DMA_CMD + 4;

/// One emulated device instance.
///
/// All register and DMA operations are atomic end-to-end relative to other
/// accesses to the same device; callers that share an instance across
/// threads wrap it in their own exclusion scope (the driver uses one mutex
/// per device).
pub struct EchoDevice {
    bank: RegisterBank,
    dma: DmaEngine,
    irq: IrqCtrl,
    local: LocalMemory,
}

impl EchoDevice {
    pub fn new() -> Self {
        Self::with_local_capacity(regs::BAR1_SIZE)
    }

    /// A device with a non-default local memory size. The DMA bounds checks
    /// and the driver's clamping both derive from this single capacity.
    pub fn with_local_capacity(bytes: usize) -> Self {
        Self {
            bank: RegisterBank::new(),
            dma: DmaEngine::new(),
            irq: IrqCtrl::new(),
            local: LocalMemory::new(bytes),
        }
    }

    /// The size of the DMA-addressable local memory in bytes.
    pub fn local_capacity(&self) -> u64 {
        self.local.len()
    }

    /// A handle to the interrupt line for handlers and tests.
    pub fn irq_line(&self) -> IrqLine {
        self.irq.line()
    }

    fn check_offset(offset: u64) -> Result<(), AccessError> {
        if offset >= regs::BAR0_SIZE {
            return Err(AccessError::OutOfRange {
                offset,
                size: regs::BAR0_SIZE,
            });
        }
        if offset % 4 != 0 {
            return Err(AccessError::Misaligned { offset });
        }
        Ok(())
    }

    /// Reads a BAR0 register.
    pub fn mmio_read(&mut self, offset: u64) -> Result<u32, AccessError> {
        Self::check_offset(offset)?;
        Ok(match offset {
            regs::REG_IRQ_CTRL => self.irq.reg_read(),
            DMA_REG_FIRST..=DMA_REG_LAST => self.dma.reg_read(offset),
            _ => self.bank.read(offset),
        })
    }

    /// Writes a BAR0 register. `mem` is the host memory a RUN command write
    /// transfers against; the fire completes before this call returns.
    pub fn mmio_write(
        &mut self,
        offset: u64,
        value: u32,
        mem: &mut dyn HostMemory,
    ) -> Result<(), AccessError> {
        Self::check_offset(offset)?;
        match offset {
            regs::REG_IRQ_CTRL => self.irq.reg_write(value),
            DMA_REG_FIRST..=DMA_REG_LAST => {
                self.dma.reg_write(offset, value, mem, &mut self.local)
            }
            _ => self.bank.write(offset, value),
        }
        Ok(())
    }

    /// Reads local data memory at widths 1/2/4/8 (open-bus out of range).
    pub fn bar1_read(&self, offset: u64, size: u8) -> u64 {
        self.local.read(offset, size)
    }

    /// Writes local data memory at widths 1/2/4/8 (dropped out of range).
    pub fn bar1_write(&mut self, offset: u64, size: u8, value: u64) {
        self.local.write(offset, size, value)
    }

    /// Direct view of local memory for mapped access.
    pub fn local_bytes(&self) -> &[u8] {
        self.local.as_slice()
    }

    /// Direct mutable view of local memory for mapped access.
    pub fn local_bytes_mut(&mut self) -> &mut [u8] {
        self.local.as_mut_slice()
    }
}

impl Default for EchoDevice {
    fn default() -> Self {
        Self::new()
    }
}
