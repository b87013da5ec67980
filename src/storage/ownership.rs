//! Per-sector record of which session tag last wrote each sector.

use std::ops::Range;

use super::error::StorageError;
use super::session::SessionTag;

/// One entry per sector. `None` means the sector was never written since the
/// last reset; it never compares equal to any session tag.
#[derive(Debug, Default)]
pub struct OwnershipTable {
    tags: Vec<Option<SessionTag>>,
}

impl OwnershipTable {
    /// Allocates an all-unassigned table. Allocation failure is reported
    /// rather than aborting the process.
    pub fn new(sectors: usize) -> Result<Self, std::collections::TryReserveError> {
        let mut tags = Vec::new();
        tags.try_reserve_exact(sectors)?;
        tags.resize(sectors, None);
        Ok(Self { tags })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn owner(&self, sector: usize) -> Option<SessionTag> {
        self.tags.get(sector).copied().flatten()
    }

    fn check(&self, sectors: &Range<usize>) -> Result<(), StorageError> {
        if sectors.start > sectors.end || sectors.end > self.tags.len() {
            return Err(StorageError::OutOfBounds {
                offset: sectors.start as u64,
                length: sectors.end.saturating_sub(sectors.start) as u64,
                capacity: self.tags.len() as u64,
            });
        }
        Ok(())
    }

    /// Tags every sector in `sectors` with `tag`. Nothing is touched when the
    /// range falls outside the table.
    pub fn assign(&mut self, sectors: Range<usize>, tag: SessionTag) -> Result<(), StorageError> {
        self.check(&sectors)?;
        self.tags[sectors].fill(Some(tag));
        Ok(())
    }

    /// True when every sector in `sectors` carries `tag`. An empty range is
    /// trivially owned.
    pub fn owned_by(&self, sectors: Range<usize>, tag: SessionTag) -> Result<bool, StorageError> {
        self.check(&sectors)?;
        Ok(self.tags[sectors].iter().all(|owner| *owner == Some(tag)))
    }

    pub fn assigned_count(&self) -> usize {
        self.tags.iter().filter(|owner| owner.is_some()).count()
    }

    /// Marks every sector unassigned.
    pub fn clear(&mut self) {
        self.tags.fill(None);
    }

    /// Drops the backing allocation. The table is empty afterwards.
    pub fn release(&mut self) {
        self.tags = Vec::new();
    }
}
