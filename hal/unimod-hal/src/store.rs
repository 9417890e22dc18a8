//! Persistent byte storage abstractions
//!
//! The registration image lives in a small EEPROM-like region. The store
//! exposes it as a flat byte range; layout and integrity checks are up to
//! the caller.

/// Errors from byte storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Underlying device failed
    Io,
    /// Access runs past the end of the store
    OutOfRange,
}

/// Byte-addressed persistent storage
pub trait ByteStore {
    /// Size of the store in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Write `data` starting at `offset`
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError>;
}

/// RAM-backed store
///
/// Starts erased (all `0xFF`). Useful on hosts and for boards that keep the
/// image in battery-backed RAM.
#[derive(Debug, Clone)]
pub struct RamStore<const N: usize> {
    bytes: [u8; N],
    writes: u32,
}

impl<const N: usize> RamStore<N> {
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            writes: 0,
        }
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    fn range(offset: usize, len: usize) -> Result<core::ops::Range<usize>, StoreError> {
        let end = offset.checked_add(len).ok_or(StoreError::OutOfRange)?;
        if end > N {
            return Err(StoreError::OutOfRange);
        }
        Ok(offset..end)
    }
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteStore for RamStore<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        let range = Self::range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError> {
        let range = Self::range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}
