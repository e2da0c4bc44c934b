//! Per-open-handle state: the bulk DMA I/O path, the direct mapped path,
//! and control commands.

use std::thread;
use std::time::Duration;

use echodev_device::regs::{
    irq_ctrl, REG_DMA_CMD, REG_DMA_CNT, REG_DMA_DST, REG_DMA_SRC, REG_ID, REG_INVERT,
    REG_IRQ_CTRL, REG_RAND,
};
use echodev_device::{DmaCmd, EchoDevice, IrqLine};
use echodev_memory::{Bus, HostMemory};
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::ioctl::IoctlRequest;
use crate::lock;
use crate::registry::SharedEchoDevice;

/// Emulated transfer latency applied on the read path (the original
/// driver's `mdelay(1)`), a blocking wait on the calling thread.
const SETTLE_DELAY: Duration = Duration::from_millis(1);

/// An open handle bound to one device.
///
/// Bulk reads and writes go through the device's DMA engine with this
/// session's bounce buffer standing in for host memory, exactly as a kernel
/// driver would stage user pages. The session's stream offset advances by
/// the bytes actually transferred; short transfers near the capacity
/// boundary are normal, not errors.
pub struct DeviceSession {
    device: SharedEchoDevice,
    bounce: Bus,
    offset: u64,
}

impl DeviceSession {
    pub(crate) fn new(device: SharedEchoDevice) -> Self {
        let capacity = lock(&device).local_capacity();
        Self {
            device,
            bounce: Bus::new(capacity as usize),
            offset: 0,
        }
    }

    /// Current stream offset for the read/write path.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Repositions the stream offset.
    pub fn seek(&mut self, pos: u64) {
        self.offset = pos;
    }

    /// Writes `buf` at the current offset through the DMA engine. Returns
    /// the number of bytes accepted: clamped to the device's remaining
    /// local-memory capacity, 0 once the offset is at or past the end.
    pub fn write(&mut self, buf: &[u8]) -> DriverResult<usize> {
        let mut dev = lock(&self.device);
        let capacity = dev.local_capacity();
        if self.offset >= capacity {
            return Ok(0);
        }
        let n = (buf.len() as u64).min(capacity - self.offset) as usize;
        if n == 0 {
            return Ok(0);
        }

        self.bounce.write_bytes(0, &buf[..n]);
        Self::fire_dma(&mut dev, &mut self.bounce, 0, self.offset, n as u64, DmaCmd::empty())?;

        debug!(offset = self.offset, requested = buf.len(), accepted = n, "bulk write");
        self.offset += n as u64;
        Ok(n)
    }

    /// Reads up to `len` bytes at the current offset through the DMA
    /// engine. Returns the bytes obtained: clamped like [`Self::write`],
    /// empty once the offset is at or past the end.
    pub fn read(&mut self, len: usize) -> DriverResult<Vec<u8>> {
        let n = {
            let mut dev = lock(&self.device);
            let capacity = dev.local_capacity();
            if self.offset >= capacity {
                return Ok(Vec::new());
            }
            let n = (len as u64).min(capacity - self.offset) as usize;
            if n == 0 {
                return Ok(Vec::new());
            }
            Self::fire_dma(
                &mut dev,
                &mut self.bounce,
                self.offset,
                0,
                n as u64,
                DmaCmd::DIRECTION,
            )?;
            n
        };

        // The device lock is released while the transfer "settles".
        thread::sleep(SETTLE_DELAY);

        let mut out = vec![0u8; n];
        self.bounce.read_bytes(0, &mut out);
        debug!(offset = self.offset, requested = len, obtained = n, "bulk read");
        self.offset += n as u64;
        Ok(out)
    }

    /// Establishes direct access to the device's local data memory,
    /// bypassing the DMA path. Both paths see the same bytes.
    pub fn mmap(&self) -> MappedRegion {
        MappedRegion {
            device: self.device.clone(),
        }
    }

    /// Executes one control command, returning its 32-bit result (0 for
    /// pure writes).
    pub fn ioctl(&mut self, request: IoctlRequest) -> DriverResult<u32> {
        let mut dev = lock(&self.device);
        match request {
            IoctlRequest::GetId => Ok(dev.mmio_read(REG_ID)?),
            IoctlRequest::GetInvert => Ok(dev.mmio_read(REG_INVERT)?),
            IoctlRequest::GetRandom => Ok(dev.mmio_read(REG_RAND)?),
            IoctlRequest::SetInvert(value) => {
                dev.mmio_write(REG_INVERT, value, &mut self.bounce)?;
                Ok(0)
            }
            IoctlRequest::RequestIrq => {
                dev.mmio_write(REG_IRQ_CTRL, irq_ctrl::ASSERT, &mut self.bounce)?;
                Ok(0)
            }
        }
    }

    /// A handle to the device's interrupt line.
    pub fn irq_line(&self) -> IrqLine {
        lock(&self.device).irq_line()
    }

    /// The interrupt handler's body: if this device has a pending
    /// interrupt, acknowledge it with a single register write. Returns
    /// whether this device was the cause.
    pub fn service_irq(&mut self) -> DriverResult<bool> {
        let mut dev = lock(&self.device);
        if !dev.irq_line().pending() {
            return Ok(false);
        }
        dev.mmio_write(REG_IRQ_CTRL, irq_ctrl::ACK, &mut self.bounce)?;
        Ok(true)
    }

    /// Programs the descriptor and fires, all through the register
    /// interface; checks the status bits the way a driver must.
    fn fire_dma(
        dev: &mut EchoDevice,
        mem: &mut Bus,
        src: u64,
        dst: u64,
        count: u64,
        extra: DmaCmd,
    ) -> DriverResult<()> {
        for (reg, val) in [(REG_DMA_SRC, src), (REG_DMA_DST, dst), (REG_DMA_CNT, count)] {
            dev.mmio_write(reg, val as u32, mem)?;
            dev.mmio_write(reg + 4, (val >> 32) as u32, mem)?;
        }
        dev.mmio_write(REG_DMA_CMD, (DmaCmd::RUN | extra).bits() as u32, mem)?;

        // DONE alone means "attempt finished"; ERROR is the verdict.
        let status = DmaCmd::from_bits_retain(u64::from(dev.mmio_read(REG_DMA_CMD)?));
        if status.contains(DmaCmd::ERROR) {
            return Err(DriverError::DmaFault);
        }
        Ok(())
    }
}

/// Direct, DMA-bypassing access to a device's local data memory.
///
/// Cloning the region or holding it across a detach is fine; it shares the
/// device's exclusion scope, so mapped access and DMA-mediated access
/// always observe a consistent view.
#[derive(Clone)]
pub struct MappedRegion {
    device: SharedEchoDevice,
}

impl MappedRegion {
    /// Mapped length in bytes.
    pub fn len(&self) -> u64 {
        lock(&self.device).local_capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian read at widths 1/2/4/8; open-bus out of range.
    pub fn read(&self, offset: u64, size: u8) -> u64 {
        lock(&self.device).bar1_read(offset, size)
    }

    /// Little-endian write at widths 1/2/4/8; dropped out of range.
    pub fn write(&self, offset: u64, size: u8, value: u64) {
        lock(&self.device).bar1_write(offset, size, value)
    }

    /// Copies out up to `dst.len()` bytes from `offset`; returns the count
    /// actually available.
    pub fn read_bytes(&self, offset: u64, dst: &mut [u8]) -> usize {
        let dev = lock(&self.device);
        let bytes = dev.local_bytes();
        let Some(start) = usize::try_from(offset).ok().filter(|&s| s < bytes.len()) else {
            return 0;
        };
        let n = dst.len().min(bytes.len() - start);
        dst[..n].copy_from_slice(&bytes[start..start + n]);
        n
    }

    /// Copies `src` in at `offset`; returns the count actually written.
    pub fn write_bytes(&self, offset: u64, src: &[u8]) -> usize {
        let mut dev = lock(&self.device);
        let bytes = dev.local_bytes_mut();
        let Some(start) = usize::try_from(offset).ok().filter(|&s| s < bytes.len()) else {
            return 0;
        };
        let n = src.len().min(bytes.len() - start);
        bytes[start..start + n].copy_from_slice(&src[..n]);
        n
    }
}
