use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

use super::config::DeviceConfig;
use super::device::{device_name, Device};
use super::error::StorageError;
use super::geometry::Geometry;
use super::request::{Request, Segment};
use super::session::SessionKey;
use crate::constants::DEFAULT_DEVICE_COUNT;

/// Opaque reference to a device owned by a [`DeviceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub(super) usize);

impl DeviceHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&device_name(self.0))
    }
}

enum DeviceSlot {
    Ready(Arc<Device>),
    Failed { name: String, reason: String },
}

pub struct DeviceManager {
    slots: Vec<DeviceSlot>,
}

impl DeviceManager {
    /// Creates one device per config. A device that fails to initialize is
    /// kept as a failed slot; the others are still created.
    pub fn new(configs: impl IntoIterator<Item = DeviceConfig>) -> Self {
        let slots = configs
            .into_iter()
            .enumerate()
            .map(|(index, config)| match Device::new(index, config) {
                Ok(device) => {
                    tracing::info!(
                        "{}: {} sectors of {} bytes",
                        device.name(),
                        device.sectors(),
                        device.sector_size()
                    );
                    DeviceSlot::Ready(device)
                }
                Err(e) => {
                    let name = device_name(index);
                    tracing::warn!("{}: initialization failed: {}", name, e);
                    DeviceSlot::Failed {
                        name,
                        reason: e.to_string(),
                    }
                }
            })
            .collect();

        Self { slots }
    }

    pub fn with_defaults() -> Self {
        Self::new((0..DEFAULT_DEVICE_COUNT).map(|_| DeviceConfig::default()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles for every slot, including failed ones.
    pub fn handles(&self) -> Vec<DeviceHandle> {
        (0..self.slots.len()).map(DeviceHandle).collect()
    }

    /// Failed slots with the reason initialization failed.
    pub fn failed(&self) -> Vec<(DeviceHandle, String)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                DeviceSlot::Failed { reason, .. } => Some((DeviceHandle(index), reason.clone())),
                DeviceSlot::Ready(_) => None,
            })
            .collect()
    }

    pub fn device(&self, handle: DeviceHandle) -> Result<Arc<Device>, StorageError> {
        match self.slots.get(handle.0) {
            Some(DeviceSlot::Ready(device)) => Ok(device.clone()),
            Some(DeviceSlot::Failed { name, reason }) => Err(StorageError::DeviceUnavailable {
                name: name.clone(),
                reason: reason.clone(),
            }),
            None => Err(StorageError::DeviceNotFound(handle.0)),
        }
    }

    pub async fn open(&self, handle: DeviceHandle) -> Result<(), StorageError> {
        self.device(handle)?.open().await
    }

    pub fn close(&self, handle: DeviceHandle) -> Result<(), StorageError> {
        self.device(handle)?.close()
    }

    pub fn submit(&self, handle: DeviceHandle, request: &mut Request) -> Result<(), StorageError> {
        self.device(handle)?.submit(request)
    }

    pub fn read(
        &self,
        handle: DeviceHandle,
        offset: u64,
        len: usize,
        session: SessionKey,
    ) -> Result<Bytes, StorageError> {
        let mut request = Request::new(offset);
        request.push(Segment::read(len, session));
        self.submit(handle, &mut request)?;

        Ok(request
            .into_segments()
            .pop()
            .map(Segment::into_bytes)
            .unwrap_or_default())
    }

    pub fn write(
        &self,
        handle: DeviceHandle,
        offset: u64,
        data: &[u8],
        session: SessionKey,
    ) -> Result<(), StorageError> {
        let mut request = Request::new(offset);
        request.push(Segment::write(data, session));
        self.submit(handle, &mut request)
    }

    pub fn geometry(&self, handle: DeviceHandle) -> Result<Geometry, StorageError> {
        Ok(self.device(handle)?.geometry())
    }

    /// Tears every device down in index order. Each device's idle timer is
    /// cancelled and awaited before its memory is released.
    pub async fn shutdown(self) {
        for slot in self.slots {
            match slot {
                DeviceSlot::Ready(device) => device.teardown().await,
                DeviceSlot::Failed { name, .. } => {
                    tracing::debug!("{}: never initialized, nothing to release", name);
                }
            }
        }
        tracing::info!("All devices shut down");
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
