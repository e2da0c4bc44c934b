//! Host-side memory abstraction for DMA-capable device models.
//!
//! A device's DMA engine copies between its local memory and "host" memory
//! addressed by the descriptor's source/destination fields. Real hardware
//! trusts those addresses (they come from the privileged driver), so the
//! trait is infallible; implementations decide what an out-of-range access
//! does. [`Bus`] behaves like an open bus: reads beyond the backing store
//! return all-ones and writes there are dropped.
#![forbid(unsafe_code)]

/// Byte-addressable host memory as seen by a device's DMA engine.
///
/// Addresses are `u64` so descriptors can carry full 64-bit pointers even on
/// 32-bit hosts. Width helpers are little-endian and carry no alignment
/// requirement.
pub trait HostMemory {
    /// Copies `dst.len()` bytes starting at `addr` into `dst`.
    fn read_bytes(&mut self, addr: u64, dst: &mut [u8]);

    /// Copies `src` into memory starting at `addr`.
    fn write_bytes(&mut self, addr: u64, src: &[u8]);

    fn read_u8(&mut self, addr: u64) -> u8 {
        let mut buf = [0u8; 1];
        self.read_bytes(addr, &mut buf);
        buf[0]
    }

    fn read_u16(&mut self, addr: u64) -> u16 {
        let mut buf = [0u8; 2];
        self.read_bytes(addr, &mut buf);
        u16::from_le_bytes(buf)
    }

    fn read_u32(&mut self, addr: u64) -> u32 {
        let mut buf = [0u8; 4];
        self.read_bytes(addr, &mut buf);
        u32::from_le_bytes(buf)
    }

    fn read_u64(&mut self, addr: u64) -> u64 {
        let mut buf = [0u8; 8];
        self.read_bytes(addr, &mut buf);
        u64::from_le_bytes(buf)
    }

    fn write_u8(&mut self, addr: u64, val: u8) {
        self.write_bytes(addr, &[val]);
    }

    fn write_u16(&mut self, addr: u64, val: u16) {
        self.write_bytes(addr, &val.to_le_bytes());
    }

    fn write_u32(&mut self, addr: u64, val: u32) {
        self.write_bytes(addr, &val.to_le_bytes());
    }

    fn write_u64(&mut self, addr: u64, val: u64) {
        self.write_bytes(addr, &val.to_le_bytes());
    }
}

/// Flat `Vec`-backed host memory.
#[derive(Debug, Clone)]
pub struct Bus {
    bytes: Vec<u8>,
}

impl Bus {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Returns the in-range prefix length of an access at `addr`.
    fn clamp(&self, addr: u64, len: usize) -> Option<(usize, usize)> {
        let start = usize::try_from(addr).ok()?;
        if start >= self.bytes.len() {
            return None;
        }
        let avail = self.bytes.len() - start;
        Some((start, len.min(avail)))
    }
}

impl HostMemory for Bus {
    fn read_bytes(&mut self, addr: u64, dst: &mut [u8]) {
        // Open-bus: the out-of-range tail reads as all-ones.
        dst.fill(0xFF);
        if let Some((start, n)) = self.clamp(addr, dst.len()) {
            dst[..n].copy_from_slice(&self.bytes[start..start + n]);
        }
    }

    fn write_bytes(&mut self, addr: u64, src: &[u8]) {
        if let Some((start, n)) = self.clamp(addr, src.len()) {
            self.bytes[start..start + n].copy_from_slice(&src[..n]);
        }
    }
}
