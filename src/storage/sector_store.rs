//! Flat RAM backing store addressed in bytes and sized in sectors.

use std::collections::TryReserveError;
use std::ops::Range;

use super::error::StorageError;

/// Sectors touched by the byte range `[offset, end)`, including sectors only
/// partially covered at either edge. An empty byte range touches no sectors.
pub fn sector_span(offset: u64, end: u64, sector_size: usize) -> Range<usize> {
    if end <= offset {
        let sector = (offset / sector_size as u64) as usize;
        return sector..sector;
    }
    let first = offset / sector_size as u64;
    let last = end.div_ceil(sector_size as u64);
    first as usize..last as usize
}

#[derive(Debug)]
pub struct SectorStore {
    data: Vec<u8>,
    sector_size: usize,
}

impl SectorStore {
    /// Allocates a zero-filled store of `sectors * sector_size` bytes.
    pub fn new(sectors: usize, sector_size: usize) -> Result<Self, TryReserveError> {
        let bytes = sectors.saturating_mul(sector_size);
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)?;
        data.resize(bytes, 0);
        Ok(Self { data, sector_size })
    }

    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    pub fn sectors(&self) -> usize {
        self.data.len() / self.sector_size
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    fn byte_range(&self, offset: u64, length: usize) -> Result<Range<usize>, StorageError> {
        let capacity = self.data.len() as u64;
        match offset.checked_add(length as u64) {
            Some(end) if end <= capacity => Ok(offset as usize..end as usize),
            _ => Err(StorageError::OutOfBounds {
                offset,
                length: length as u64,
                capacity,
            }),
        }
    }

    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = self.byte_range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        let range = self.byte_range(offset, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }

    /// Frees the backing memory. Reads and writes fail afterwards.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_span() {
        assert_eq!(sector_span(0, 512, 512), 0..1);
        assert_eq!(sector_span(0, 600, 512), 0..2);
        assert_eq!(sector_span(511, 513, 512), 0..2);
        assert_eq!(sector_span(512, 1024, 512), 1..2);
        assert_eq!(sector_span(100, 100, 512), 0..0);
        assert_eq!(sector_span(4096, 4097, 4096), 1..2);
    }

    #[test]
    fn test_new_store_is_zeroed() {
        let store = SectorStore::new(16, 512).unwrap();
        assert_eq!(store.capacity_bytes(), 8192);
        assert_eq!(store.sectors(), 16);
        assert!(store.is_zeroed());
    }

    #[test]
    fn test_write_then_read() {
        let mut store = SectorStore::new(4, 512).unwrap();
        store.write(510, &[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 6];
        store.read(509, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_bounds() {
        let mut store = SectorStore::new(2, 512).unwrap();
        assert!(store.write(1020, &[0xFF; 4]).is_ok());
        assert!(store.write(1021, &[0xFF; 4]).is_err());
        assert!(store.write(u64::MAX, &[0xFF]).is_err());

        let mut buf = [0u8; 8];
        assert!(matches!(
            store.read(1020, &mut buf),
            Err(StorageError::OutOfBounds { capacity: 1024, .. })
        ));
    }

    #[test]
    fn test_zero_and_release() {
        let mut store = SectorStore::new(2, 512).unwrap();
        store.write(0, &[0xAA; 1024]).unwrap();
        assert!(!store.is_zeroed());

        store.zero();
        assert!(store.is_zeroed());

        store.release();
        assert!(!store.is_allocated());
        assert!(store.write(0, &[1]).is_err());
    }
}
