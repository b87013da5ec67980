//! Sector transfer engine.
//!
//! Writes tag every sector they touch with the writer's session tag before the
//! payload is copied, so a partial-sector write claims the whole sector. Reads
//! compare every covered sector against the reader's tag and hand back an
//! all-zero buffer if any of them belongs to someone else or was never
//! written.
//!
//! No lock is held across a whole transfer. The ownership table is locked
//! once for the tag pass and the store is locked per sector-sized chunk, so
//! concurrent transfers over the same sectors interleave and the last store
//! to a byte range wins.

use std::ops::Range;

use parking_lot::RwLock;

use super::error::StorageError;
use super::ownership::OwnershipTable;
use super::request::Direction;
use super::sector_store::{sector_span, SectorStore};
use super::session::{SessionKey, SessionRegistry};

/// Splits `[offset, offset + len)` at sector boundaries, yielding each
/// chunk's device offset and its range within the caller's buffer.
fn sector_chunks(
    offset: u64,
    len: usize,
    sector_size: usize,
) -> impl Iterator<Item = (u64, Range<usize>)> {
    let mut done = 0usize;
    std::iter::from_fn(move || {
        if done >= len {
            return None;
        }
        let pos = offset + done as u64;
        let to_boundary = sector_size - (pos % sector_size as u64) as usize;
        let take = to_boundary.min(len - done);
        let chunk = done..done + take;
        done += take;
        Some((pos, chunk))
    })
}

pub struct TransferEngine<'a> {
    store: &'a RwLock<SectorStore>,
    ownership: &'a RwLock<OwnershipTable>,
    sessions: &'a SessionRegistry,
    sector_size: usize,
    capacity: u64,
}

impl<'a> TransferEngine<'a> {
    pub fn new(
        store: &'a RwLock<SectorStore>,
        ownership: &'a RwLock<OwnershipTable>,
        sessions: &'a SessionRegistry,
        sector_size: usize,
        capacity: u64,
    ) -> Self {
        Self {
            store,
            ownership,
            sessions,
            sector_size,
            capacity,
        }
    }

    pub fn transfer(
        &self,
        offset: u64,
        buf: &mut [u8],
        direction: Direction,
        session: SessionKey,
    ) -> Result<(), StorageError> {
        let length = buf.len() as u64;
        let end = match offset.checked_add(length) {
            Some(end) if end <= self.capacity => end,
            _ => {
                tracing::debug!(
                    "Beyond-end {:?} rejected: offset {}, length {}, capacity {}",
                    direction,
                    offset,
                    length,
                    self.capacity
                );
                return Err(StorageError::OutOfBounds {
                    offset,
                    length,
                    capacity: self.capacity,
                });
            }
        };

        let tag = self.sessions.resolve(session);
        let sectors = sector_span(offset, end, self.sector_size);

        match direction {
            Direction::Write => {
                self.ownership.write().assign(sectors, tag)?;
                for (pos, chunk) in sector_chunks(offset, buf.len(), self.sector_size) {
                    self.store.write().write(pos, &buf[chunk])?;
                }
            }
            Direction::Read => {
                let owned = self.ownership.read().owned_by(sectors.clone(), tag)?;
                if !owned {
                    tracing::trace!(
                        "Masking read of sectors {}..{} for session {} (tag {})",
                        sectors.start,
                        sectors.end,
                        session,
                        tag.0
                    );
                    buf.fill(0);
                    return Ok(());
                }
                for (pos, chunk) in sector_chunks(offset, buf.len(), self.sector_size) {
                    self.store.read().read(pos, &mut buf[chunk])?;
                }
            }
        }

        Ok(())
    }
}
