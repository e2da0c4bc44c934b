//! BAR0 register map for the echo device.
//!
//! The control window is 64 bytes (16 × u32 slots), 4-byte aligned:
//!
//! ```text
//! 0x00  ID        R    fixed identity value (0xCAFEAFFE)
//! 0x04  INVERT    R/W  read returns the complement of the last write
//! 0x08  IRQ_CTRL  R/W  bit0 requests assert; bit1 acknowledges
//! 0x0C  RAND      R    fresh pseudo-random value on every read
//! 0x10  DMA_SRC   R/W  descriptor source address (64-bit, low half first)
//! 0x18  DMA_DST   R/W  descriptor destination address (64-bit)
//! 0x20  DMA_CNT   R/W  descriptor byte count (64-bit)
//! 0x28  DMA_CMD   R/W  bit0 RUN, bit1 DIRECTION, bit30 ERROR, bit31 DONE
//! 0x30+           R/W  scratch, stored verbatim
//! ```

/// Size of the BAR0 control window in bytes.
pub const BAR0_SIZE: u64 = 64;

/// Size of the BAR1 local data memory in bytes.
pub const BAR1_SIZE: usize = 4096;

/// Value read back from [`REG_ID`].
pub const ECHODEV_ID: u32 = 0xCAFE_AFFE;

pub const REG_ID: u64 = 0x00;
pub const REG_INVERT: u64 = 0x04;
pub const REG_IRQ_CTRL: u64 = 0x08;
pub const REG_RAND: u64 = 0x0C;

/// 64-bit descriptor fields; the low 32 bits live at the named offset and
/// the high 32 bits at the named offset + 4.
pub const REG_DMA_SRC: u64 = 0x10;
pub const REG_DMA_DST: u64 = 0x18;
pub const REG_DMA_CNT: u64 = 0x20;
pub const REG_DMA_CMD: u64 = 0x28;

/// First of the four verbatim scratch slots (0x30, 0x34, 0x38, 0x3C).
pub const REG_SCRATCH_BASE: u64 = 0x30;

pub mod irq_ctrl {
    /// Driver writes this bit to request interrupt assertion.
    pub const ASSERT: u32 = 1 << 0;
    /// Driver writes this bit to acknowledge and deassert.
    pub const ACK: u32 = 1 << 1;
}
