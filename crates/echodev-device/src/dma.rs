//! The device's DMA engine: descriptor registers plus the synchronous copy.
//!
//! The model is synchronous: a command write that sets RUN executes the
//! transfer before the write returns. Drivers must still treat completion as
//! if it could be deferred (real hardware would not guarantee this) and read
//! DONE/ERROR from the command register.

use bitflags::bitflags;
use echodev_memory::HostMemory;
use tracing::{debug, trace};

use crate::bar1::LocalMemory;
use crate::regs;

bitflags! {
    /// Defined bits of the DMA command register. Undefined bits written by
    /// the driver are preserved verbatim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaCmd: u64 {
        /// Write 1 to fire the transfer.
        const RUN = 1 << 0;
        /// 0 = host to device, 1 = device to host.
        const DIRECTION = 1 << 1;
        /// Set instead of copying when the device-local endpoint is out of
        /// bounds.
        const ERROR = 1 << 30;
        /// Set when a fire attempt finishes, successful or not.
        const DONE = 1 << 31;
    }
}

/// Transfer direction, named for the data's destination relative to the
/// device's local memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    /// Host memory -> local memory.
    ToDevice,
    /// Local memory -> host memory.
    FromDevice,
}

/// Descriptor state and execution for one device.
///
/// Owns the four 64-bit descriptor registers (0x10..=0x2C); each field's low
/// half sits at the named offset and its high half 4 bytes past.
#[derive(Debug, Default)]
pub struct DmaEngine {
    src: u64,
    dst: u64,
    cnt: u64,
    cmd: u64,
}

impl DmaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(&self) -> DmaCmd {
        DmaCmd::from_bits_retain(self.cmd)
    }

    pub fn direction(&self) -> DmaDirection {
        if self.command().contains(DmaCmd::DIRECTION) {
            DmaDirection::FromDevice
        } else {
            DmaDirection::ToDevice
        }
    }

    /// Reads one 32-bit half of a descriptor register.
    pub fn reg_read(&self, offset: u64) -> u32 {
        let (field, high) = self.field(offset);
        if high {
            (*field >> 32) as u32
        } else {
            *field as u32
        }
    }

    /// Writes one 32-bit half of a descriptor register. A write to the low
    /// half of DMA_CMD with RUN set fires the transfer synchronously.
    pub fn reg_write(
        &mut self,
        offset: u64,
        value: u32,
        mem: &mut dyn HostMemory,
        local: &mut LocalMemory,
    ) {
        {
            let (field, high) = self.field_mut(offset);
            if high {
                *field = (*field & 0xFFFF_FFFF) | (u64::from(value) << 32);
            } else {
                *field = (*field & !0xFFFF_FFFF) | u64::from(value);
            }
        }
        if offset == regs::REG_DMA_CMD && DmaCmd::from_bits_retain(u64::from(value)).contains(DmaCmd::RUN) {
            self.fire(mem, local);
        }
    }

    fn field(&self, offset: u64) -> (&u64, bool) {
        let base = offset & !0x7;
        let field = match base {
            regs::REG_DMA_SRC => &self.src,
            regs::REG_DMA_DST => &self.dst,
            regs::REG_DMA_CNT => &self.cnt,
            _ => &self.cmd,
        };
        (field, offset & 0x4 != 0)
    }

    fn field_mut(&mut self, offset: u64) -> (&mut u64, bool) {
        let base = offset & !0x7;
        let field = match base {
            regs::REG_DMA_SRC => &mut self.src,
            regs::REG_DMA_DST => &mut self.dst,
            regs::REG_DMA_CNT => &mut self.cnt,
            _ => &mut self.cmd,
        };
        (field, offset & 0x4 != 0)
    }

    fn range_ok(addr: u64, cnt: u64, len: u64) -> bool {
        addr.checked_add(cnt).map_or(false, |end| end <= len)
    }

    /// Executes the configured transfer. Only the device-local endpoint is
    /// range-checked; host addresses come from the privileged caller and are
    /// trusted. RUN clears and DONE sets whether or not the copy happened.
    fn fire(&mut self, mem: &mut dyn HostMemory, local: &mut LocalMemory) {
        let mut cmd = self.command();
        cmd.remove(DmaCmd::DONE | DmaCmd::ERROR);

        let direction = self.direction();
        trace!(
            ?direction,
            src = self.src,
            dst = self.dst,
            cnt = self.cnt,
            "dma fire"
        );

        let copied = match direction {
            DmaDirection::ToDevice => {
                if Self::range_ok(self.dst, self.cnt, local.len()) {
                    let dst = self.dst as usize;
                    let cnt = self.cnt as usize;
                    mem.read_bytes(self.src, &mut local.as_mut_slice()[dst..dst + cnt]);
                    true
                } else {
                    false
                }
            }
            DmaDirection::FromDevice => {
                if Self::range_ok(self.src, self.cnt, local.len()) {
                    let src = self.src as usize;
                    let cnt = self.cnt as usize;
                    mem.write_bytes(self.dst, &local.as_slice()[src..src + cnt]);
                    true
                } else {
                    false
                }
            }
        };

        if !copied {
            cmd.insert(DmaCmd::ERROR);
            debug!(
                ?direction,
                src = self.src,
                dst = self.dst,
                cnt = self.cnt,
                "dma descriptor exceeds local memory bounds"
            );
        }

        // DONE means "attempt finished", not "succeeded".
        cmd.remove(DmaCmd::RUN);
        cmd.insert(DmaCmd::DONE);
        self.cmd = cmd.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echodev_memory::Bus;

    fn engine_with(src: u64, dst: u64, cnt: u64) -> DmaEngine {
        let mut dma = DmaEngine::default();
        dma.src = src;
        dma.dst = dst;
        dma.cnt = cnt;
        dma
    }

    #[test]
    fn halves_assemble_into_sixty_four_bits() {
        let mut dma = DmaEngine::new();
        let mut mem = Bus::new(0);
        let mut local = LocalMemory::new(0);

        dma.reg_write(regs::REG_DMA_SRC, 0x2222_1111, &mut mem, &mut local);
        dma.reg_write(regs::REG_DMA_SRC + 4, 0x4444_3333, &mut mem, &mut local);
        assert_eq!(dma.src, 0x4444_3333_2222_1111);
        assert_eq!(dma.reg_read(regs::REG_DMA_SRC), 0x2222_1111);
        assert_eq!(dma.reg_read(regs::REG_DMA_SRC + 4), 0x4444_3333);
    }

    #[test]
    fn to_device_copies_and_settles_status() {
        let mut mem = Bus::new(64);
        mem.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        let mut local = LocalMemory::new(16);

        let mut dma = engine_with(0, 8, 4);
        dma.reg_write(regs::REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut mem, &mut local);

        assert_eq!(&local.as_slice()[8..12], &[1, 2, 3, 4]);
        let cmd = dma.command();
        assert!(cmd.contains(DmaCmd::DONE));
        assert!(!cmd.contains(DmaCmd::ERROR));
        assert!(!cmd.contains(DmaCmd::RUN));
    }

    #[test]
    fn from_device_copies_out() {
        let mut mem = Bus::new(64);
        let mut local = LocalMemory::new(16);
        local.as_mut_slice()[2..6].copy_from_slice(&[9, 8, 7, 6]);

        let mut dma = engine_with(2, 32, 4);
        let run = (DmaCmd::RUN | DmaCmd::DIRECTION).bits() as u32;
        dma.reg_write(regs::REG_DMA_CMD, run, &mut mem, &mut local);

        assert_eq!(&mem.as_slice()[32..36], &[9, 8, 7, 6]);
        assert!(dma.command().contains(DmaCmd::DONE));
        assert!(!dma.command().contains(DmaCmd::ERROR));
    }

    #[test]
    fn local_overrun_sets_error_and_copies_nothing() {
        let mut mem = Bus::new(8192);
        mem.as_mut_slice().fill(0xAB);
        let mut local = LocalMemory::new(16);

        let mut dma = engine_with(0, 12, 8);
        dma.reg_write(regs::REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut mem, &mut local);

        assert!(local.as_slice().iter().all(|&b| b == 0), "no partial copy on a bounds failure");
        let cmd = dma.command();
        assert!(cmd.contains(DmaCmd::ERROR));
        assert!(cmd.contains(DmaCmd::DONE));
        assert!(!cmd.contains(DmaCmd::RUN));
    }

    #[test]
    fn count_overflow_is_a_bounds_failure() {
        let mut mem = Bus::new(16);
        let mut local = LocalMemory::new(16);

        let mut dma = engine_with(0, 8, u64::MAX);
        dma.reg_write(regs::REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut mem, &mut local);
        assert!(dma.command().contains(DmaCmd::ERROR));
    }

    #[test]
    fn refire_after_error_clears_error() {
        let mut mem = Bus::new(64);
        let mut local = LocalMemory::new(16);

        let mut dma = engine_with(0, 100, 4);
        dma.reg_write(regs::REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut mem, &mut local);
        assert!(dma.command().contains(DmaCmd::ERROR));

        dma.dst = 0;
        dma.reg_write(regs::REG_DMA_CMD, DmaCmd::RUN.bits() as u32, &mut mem, &mut local);
        assert!(!dma.command().contains(DmaCmd::ERROR));
        assert!(dma.command().contains(DmaCmd::DONE));
    }

    #[test]
    fn command_write_without_run_does_not_fire() {
        let mut mem = Bus::new(16);
        mem.as_mut_slice().fill(0x55);
        let mut local = LocalMemory::new(16);

        let mut dma = engine_with(0, 0, 4);
        dma.reg_write(regs::REG_DMA_CMD, 0, &mut mem, &mut local);
        assert!(local.as_slice().iter().all(|&b| b == 0));
        assert!(!dma.command().contains(DmaCmd::DONE));
    }
}
