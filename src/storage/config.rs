use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::StorageError;
use super::session::{ModuloPartition, PartitionPolicy, SessionRegistry};
use crate::constants::{
    DEFAULT_IDLE_DELAY, DEFAULT_SECTOR_COUNT, DEFAULT_SECTOR_SIZE, DEFAULT_SESSION_SLOTS,
    KERNEL_SECTOR_SIZE,
};

/// Per-device sizing, timing and session partitioning.
#[derive(Clone)]
pub struct DeviceConfig {
    pub sector_size: usize,
    pub sectors: usize,
    pub idle_delay: Duration,
    pub session_slots: usize,
    pub partition: Arc<dyn PartitionPolicy>,
}

impl DeviceConfig {
    pub fn new(sectors: usize, sector_size: usize) -> Self {
        Self {
            sectors,
            sector_size,
            ..Self::default()
        }
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn with_session_slots(mut self, slots: usize) -> Self {
        self.session_slots = slots;
        self
    }

    pub fn with_partition(mut self, partition: Arc<dyn PartitionPolicy>) -> Self {
        self.partition = partition;
        self
    }

    /// Capacity in bytes, or `None` if it does not fit the address space.
    pub fn capacity_bytes(&self) -> Option<u64> {
        (self.sectors as u64).checked_mul(self.sector_size as u64)
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.sector_size == 0 || self.sector_size % KERNEL_SECTOR_SIZE != 0 {
            return Err(StorageError::InvalidConfig(format!(
                "sector size {} is not a nonzero multiple of {}",
                self.sector_size, KERNEL_SECTOR_SIZE
            )));
        }
        if self.sectors == 0 {
            return Err(StorageError::InvalidConfig("device has no sectors".into()));
        }
        self.session_registry().map(|_| ())
    }

    pub(crate) fn session_registry(&self) -> Result<SessionRegistry, StorageError> {
        SessionRegistry::new(self.session_slots, Arc::clone(&self.partition))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sector_size: DEFAULT_SECTOR_SIZE,
            sectors: DEFAULT_SECTOR_COUNT,
            idle_delay: DEFAULT_IDLE_DELAY,
            session_slots: DEFAULT_SESSION_SLOTS,
            partition: Arc::new(ModuloPartition),
        }
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("sector_size", &self.sector_size)
            .field("sectors", &self.sectors)
            .field("idle_delay", &self.idle_delay)
            .field("session_slots", &self.session_slots)
            .finish_non_exhaustive()
    }
}
