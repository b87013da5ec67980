//! Session-isolated RAM block storage.
//!
//! This module implements a fixed-capacity virtual disk that remembers, per
//! sector, which session last wrote it. A read succeeds only for sectors the
//! reader's own session wrote; otherwise the whole read comes back zeroed.
//!
//! # Overview
//!
//! Callers address the disk in bytes. Session keys are reduced to a small
//! fixed set of session tags (two by default, split by key parity), and tags
//! are recorded at sector granularity. A write that touches any byte of a
//! sector claims the entire sector.
//!
//! After the last handle closes, an idle timer runs. If nobody reopens the
//! device before it fires, the media is treated as removed and the next open
//! finds an all-zero device with no sector owners.
//!
//! # Components
//!
//! - [`DeviceManager`] - Owns every device and hands out [`DeviceHandle`]s
//! - [`Device`] - One virtual disk: store, ownership table, lifecycle
//! - [`TransferEngine`] - Moves bytes for one range and enforces isolation
//! - [`RequestDispatcher`] - Runs the [`Segment`]s of a [`Request`] in order
//! - [`SectorStore`] / [`OwnershipTable`] - Backing bytes and per-sector tags
//! - [`SessionRegistry`] - Session slots and the [`PartitionPolicy`] over them
//!
//! # Examples
//!
//! ```no_run
//! use sblk::storage::{DeviceConfig, DeviceManager, Request, SessionKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DeviceManager::new(vec![DeviceConfig::new(16, 512)]);
//! let disk = manager.handles()[0];
//!
//! manager.open(disk).await?;
//!
//! let alice = SessionKey(1);
//! let bob = SessionKey(2);
//!
//! // Alice writes a sector
//! manager.write(disk, 0, &[0xAA; 512], alice)?;
//!
//! // Alice reads it back, Bob sees zeros
//! assert_eq!(&manager.read(disk, 0, 512, alice)?[..], &[0xAA; 512][..]);
//! assert_eq!(&manager.read(disk, 0, 512, bob)?[..], &[0u8; 512][..]);
//!
//! // Scatter/gather: segments are laid out back to back
//! let mut request = Request::new(512).with_session(alice).write([1u8; 100]).read(412);
//! manager.submit(disk, &mut request)?;
//!
//! manager.close(disk)?;
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod device;
mod error;
mod geometry;
mod lifecycle;
mod manager;
mod ownership;
mod request;
mod sector_store;
mod session;
mod transfer;

pub use config::DeviceConfig;
pub use device::{device_name, Device};
pub use error::StorageError;
pub use geometry::Geometry;
pub use lifecycle::LifecycleState;
pub use manager::{DeviceHandle, DeviceManager};
pub use ownership::OwnershipTable;
pub use request::{Direction, Request, RequestDispatcher, Segment};
pub use sector_store::{sector_span, SectorStore};
pub use session::{ModuloPartition, PartitionPolicy, SessionKey, SessionRegistry, SessionTag};
pub use transfer::TransferEngine;
