//! Device constants and tuning parameters.
//!
//! Defaults for every [`DeviceConfig`](crate::storage::DeviceConfig) field live
//! here, alongside the fixed values used for geometry reporting and naming.

use std::time::Duration;

// ============================================================================
// Sizing
// ============================================================================

/// Sector size the host block layer always addresses us in, regardless of
/// the device's own sector size.
pub const KERNEL_SECTOR_SIZE: usize = 512;

/// Default device sector size in bytes.
pub const DEFAULT_SECTOR_SIZE: usize = 512;

/// Default device capacity in sectors (4 MiB at the default sector size).
pub const DEFAULT_SECTOR_COUNT: usize = 1024 * 8;

/// Number of devices created by [`DeviceManager::with_defaults`](crate::storage::DeviceManager::with_defaults).
pub const DEFAULT_DEVICE_COUNT: usize = 1;

// ============================================================================
// Sessions
// ============================================================================

/// Number of session slots a device partitions session keys into.
pub const DEFAULT_SESSION_SLOTS: usize = 2;

/// Largest partition width; each slot needs a distinct 16-bit tag.
pub const MAX_SESSION_SLOTS: usize = u16::MAX as usize;

/// Session key used when a caller never supplies one.
pub const DEFAULT_SESSION_KEY: u64 = 1234;

// ============================================================================
// Media change simulation
// ============================================================================

/// Idle time after the last handle closes before the media is marked changed.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(30);

// ============================================================================
// Naming and geometry
// ============================================================================

/// Prefix for generated device names (`sblka`, `sblkb`, ...).
pub const DEVICE_NAME_PREFIX: &str = "sblk";

/// Heads reported by the synthetic geometry.
pub const GEOMETRY_HEADS: u8 = 4;

/// Sectors per track reported by the synthetic geometry.
pub const GEOMETRY_SECTORS_PER_TRACK: u8 = 16;

/// First data sector reported by the synthetic geometry.
pub const GEOMETRY_DATA_START: u64 = 4;
