use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transfer beyond end of device: offset {offset}, length {length}, capacity {capacity}")]
    OutOfBounds {
        offset: u64,
        length: u64,
        capacity: u64,
    },

    #[error("allocation failed for device {device}: {bytes} bytes")]
    AllocationFailed { device: String, bytes: u64 },

    #[error("invalid device config: {0}")]
    InvalidConfig(String),

    #[error("device not found: {0}")]
    DeviceNotFound(usize),

    #[error("device unavailable: {name} ({reason})")]
    DeviceUnavailable { name: String, reason: String },

    #[error("device not open: {0}")]
    NotOpen(String),

    #[error("device released: {0}")]
    Released(String),
}
