use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::config::DeviceConfig;
use super::error::StorageError;
use super::geometry::Geometry;
use super::lifecycle::Lifecycle;
use super::ownership::OwnershipTable;
use super::request::{Direction, Request, RequestDispatcher};
use super::sector_store::SectorStore;
use super::session::{SessionKey, SessionRegistry, SessionTag};
use super::transfer::TransferEngine;
use crate::constants::{DEVICE_NAME_PREFIX, KERNEL_SECTOR_SIZE};

/// Stable external name for the device at `index`: `sblka`, `sblkb`, ...
pub fn device_name(index: usize) -> String {
    if index < 26 {
        format!("{}{}", DEVICE_NAME_PREFIX, (b'a' + index as u8) as char)
    } else {
        format!("{}{}", DEVICE_NAME_PREFIX, index)
    }
}

pub struct Device {
    index: usize,
    name: String,
    config: DeviceConfig,
    capacity: u64,
    pub(super) store: RwLock<SectorStore>,
    pub(super) ownership: RwLock<OwnershipTable>,
    sessions: SessionRegistry,
    pub(super) media_changed: AtomicBool,
    pub(super) released: AtomicBool,
    pub(super) lifecycle: Mutex<Lifecycle>,
}

impl Device {
    pub fn new(index: usize, config: DeviceConfig) -> Result<Arc<Self>, StorageError> {
        let name = device_name(index);
        config.validate()?;

        let capacity = config
            .capacity_bytes()
            .filter(|bytes| usize::try_from(*bytes).is_ok())
            .ok_or_else(|| StorageError::AllocationFailed {
                device: name.clone(),
                bytes: u64::MAX,
            })?;

        let store = SectorStore::new(config.sectors, config.sector_size).map_err(|_| {
            StorageError::AllocationFailed {
                device: name.clone(),
                bytes: capacity,
            }
        })?;
        let ownership = OwnershipTable::new(config.sectors).map_err(|_| {
            StorageError::AllocationFailed {
                device: name.clone(),
                bytes: config.sectors as u64,
            }
        })?;

        let sessions = config.session_registry()?;

        Ok(Arc::new(Self {
            index,
            name,
            sessions,
            config,
            capacity,
            store: RwLock::new(store),
            ownership: RwLock::new(ownership),
            media_changed: AtomicBool::new(false),
            released: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
        }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn sector_size(&self) -> usize {
        self.config.sector_size
    }

    pub fn sectors(&self) -> usize {
        self.config.sectors
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity
    }

    /// Capacity in the 512-byte units the host block layer counts in.
    pub fn kernel_sectors(&self) -> u64 {
        self.sectors() as u64 * (self.sector_size() / KERNEL_SECTOR_SIZE) as u64
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::for_kernel_sectors(self.kernel_sectors())
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Tag of the session that last wrote `sector`, if any.
    pub fn owner(&self, sector: usize) -> Option<SessionTag> {
        self.ownership.read().owner(sector)
    }

    pub fn assigned_sectors(&self) -> usize {
        self.ownership.read().assigned_count()
    }

    /// True when every byte of the backing store is zero.
    pub fn is_zeroed(&self) -> bool {
        self.store.read().is_zeroed()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<(), StorageError> {
        if self.is_released() {
            return Err(StorageError::Released(self.name.clone()));
        }
        Ok(())
    }

    fn engine(&self) -> TransferEngine<'_> {
        TransferEngine::new(
            &self.store,
            &self.ownership,
            &self.sessions,
            self.config.sector_size,
            self.capacity,
        )
    }

    /// Moves `buf.len()` bytes between `buf` and the device at `offset`.
    pub fn transfer(
        &self,
        offset: u64,
        buf: &mut [u8],
        direction: Direction,
        session: SessionKey,
    ) -> Result<(), StorageError> {
        self.ensure_live()?;
        self.engine().transfer(offset, buf, direction, session)
    }

    /// Runs every segment of `request` in order, stopping at the first failure.
    pub fn submit(&self, request: &mut Request) -> Result<(), StorageError> {
        self.ensure_live()?;
        RequestDispatcher::new(self).dispatch(request)
    }

    /// Zeroes the data and forgets every sector's owner.
    pub(super) fn reset_media(&self) {
        self.store.write().zero();
        self.ownership.write().clear();
    }

    /// Frees the backing store and ownership table.
    pub(super) fn release(&self) {
        self.released.store(true, Ordering::Release);
        self.store.write().release();
        self.ownership.write().release();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("sectors", &self.config.sectors)
            .field("sector_size", &self.config.sector_size)
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}
