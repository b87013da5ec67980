//! sblk - A session-isolated RAM block device
//!
//! This library provides a RAM-backed virtual disk that attributes every
//! written sector to the session that wrote it and hides that data from
//! every other session. An idle timer simulates media removal once the
//! device has been closed for long enough.
//!
//! # Modules
//!
//! - [`storage`] - Devices, transfers, requests, lifecycle and the device manager
//! - [`constants`] - Defaults and fixed driver values

pub mod constants;
pub mod storage;

pub use storage::{
    Device, DeviceConfig, DeviceHandle, DeviceManager, Direction, Geometry, LifecycleState,
    PartitionPolicy, Request, Segment, SessionKey, SessionTag, StorageError,
};
