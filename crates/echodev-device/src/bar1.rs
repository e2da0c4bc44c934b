//! BAR1 local data memory.
//!
//! A flat byte buffer addressable at widths 1/2/4/8 with no alignment
//! requirement. Accesses that fall outside the buffer (or use an unsupported
//! width) behave like an open bus: reads return all-ones and writes are
//! dropped.

/// The device's local data memory.
#[derive(Debug, Clone)]
pub struct LocalMemory {
    bytes: Vec<u8>,
}

impl LocalMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn span(&self, offset: u64, size: u8) -> Option<usize> {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return None;
        }
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(size as usize)?;
        (end <= self.bytes.len()).then_some(start)
    }

    /// Reads a little-endian value of `size` bytes at `offset`.
    pub fn read(&self, offset: u64, size: u8) -> u64 {
        let Some(start) = self.span(offset, size) else {
            // Open-bus value, truncated to the access width below.
            return match size {
                1 => 0xFF,
                2 => 0xFFFF,
                4 => 0xFFFF_FFFF,
                _ => u64::MAX,
            };
        };
        let mut buf = [0u8; 8];
        buf[..size as usize].copy_from_slice(&self.bytes[start..start + size as usize]);
        u64::from_le_bytes(buf)
    }

    /// Writes the low `size` bytes of `value` at `offset`, little-endian.
    pub fn write(&mut self, offset: u64, size: u8, value: u64) {
        let Some(start) = self.span(offset, size) else {
            return;
        };
        self.bytes[start..start + size as usize]
            .copy_from_slice(&value.to_le_bytes()[..size as usize]);
    }
}
