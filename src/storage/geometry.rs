use crate::constants::{GEOMETRY_DATA_START, GEOMETRY_HEADS, GEOMETRY_SECTORS_PER_TRACK};

/// Synthetic cylinder/head/sector geometry for a virtual disk.
///
/// There is no physical layout to report, so the device claims four heads and
/// sixteen sectors per track and derives a cylinder count from its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cylinders: u64,
    pub heads: u8,
    pub sectors: u8,
    pub start: u64,
}

impl Geometry {
    /// `size` is the capacity in 512-byte kernel sectors.
    pub fn for_kernel_sectors(size: u64) -> Self {
        Self {
            cylinders: (size & !0x3f) >> 6,
            heads: GEOMETRY_HEADS,
            sectors: GEOMETRY_SECTORS_PER_TRACK,
            start: GEOMETRY_DATA_START,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_geometry() {
        let geo = Geometry::for_kernel_sectors(8192);
        assert_eq!(geo.cylinders, 128);
        assert_eq!(geo.heads, 4);
        assert_eq!(geo.sectors, 16);
        assert_eq!(geo.start, 4);
    }

    #[test]
    fn test_partial_cylinder_is_dropped() {
        assert_eq!(Geometry::for_kernel_sectors(127).cylinders, 1);
        assert_eq!(Geometry::for_kernel_sectors(63).cylinders, 0);
    }
}
