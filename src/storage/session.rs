//! Session keys, session tags, and the partition that maps one onto the other.
//!
//! A device keeps a small fixed table of session tags. Every caller-supplied
//! [`SessionKey`] is reduced to one slot of that table by a [`PartitionPolicy`],
//! and the tag stored in the slot is what gets recorded against written
//! sectors. Two keys that land in the same slot are indistinguishable to the
//! isolation check.

use std::fmt;
use std::sync::Arc;

use super::error::StorageError;
use crate::constants::{DEFAULT_SESSION_KEY, DEFAULT_SESSION_SLOTS, MAX_SESSION_SLOTS};

/// An opaque caller-supplied session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey(pub u64);

impl Default for SessionKey {
    fn default() -> Self {
        SessionKey(DEFAULT_SESSION_KEY)
    }
}

impl From<u64> for SessionKey {
    fn from(key: u64) -> Self {
        SessionKey(key)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The resolved identity recorded per sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTag(pub u16);

/// Reduces a session key to a slot index in `0..width`.
pub trait PartitionPolicy: Send + Sync {
    fn slot(&self, key: SessionKey, width: usize) -> usize;
}

/// Key modulo width. With two slots this is the key's parity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuloPartition;

impl PartitionPolicy for ModuloPartition {
    fn slot(&self, key: SessionKey, width: usize) -> usize {
        (key.0 % width as u64) as usize
    }
}

impl<F> PartitionPolicy for F
where
    F: Fn(SessionKey, usize) -> usize + Send + Sync,
{
    fn slot(&self, key: SessionKey, width: usize) -> usize {
        self(key, width)
    }
}

/// Fixed table of session tags plus the policy that picks a slot.
pub struct SessionRegistry {
    tags: Vec<SessionTag>,
    policy: Arc<dyn PartitionPolicy>,
}

impl SessionRegistry {
    /// Builds a registry with `width` slots; slot `i` holds tag `i`.
    ///
    /// Every slot needs its own tag, so `width` must lie in `1..=u16::MAX`.
    pub fn new(width: usize, policy: Arc<dyn PartitionPolicy>) -> Result<Self, StorageError> {
        if width == 0 || width > MAX_SESSION_SLOTS {
            return Err(StorageError::InvalidConfig(format!(
                "session slots {} outside 1..={}",
                width, MAX_SESSION_SLOTS
            )));
        }
        Ok(Self::with_width(width, policy))
    }

    fn with_width(width: usize, policy: Arc<dyn PartitionPolicy>) -> Self {
        let tags = (0..width).map(|slot| SessionTag(slot as u16)).collect();
        Self { tags, policy }
    }

    pub fn width(&self) -> usize {
        self.tags.len()
    }

    pub fn tags(&self) -> &[SessionTag] {
        &self.tags
    }

    /// Slot index for `key`. Policies that answer out of range are folded
    /// back into the table.
    pub fn slot(&self, key: SessionKey) -> usize {
        self.policy.slot(key, self.width()) % self.width()
    }

    pub fn resolve(&self, key: SessionKey) -> SessionTag {
        self.tags[self.slot(key)]
    }

    pub fn is_registered(&self, tag: SessionTag) -> bool {
        self.tags.contains(&tag)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_width(DEFAULT_SESSION_SLOTS, Arc::new(ModuloPartition))
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_splits_by_parity() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.width(), 2);

        assert_eq!(registry.resolve(SessionKey(1)), SessionTag(1));
        assert_eq!(registry.resolve(SessionKey(3)), SessionTag(1));
        assert_eq!(registry.resolve(SessionKey(2)), SessionTag(0));
        assert_eq!(registry.resolve(SessionKey(1234)), SessionTag(0));
    }

    #[test]
    fn test_wider_partition() {
        let registry = SessionRegistry::new(4, Arc::new(ModuloPartition)).unwrap();
        assert_eq!(registry.resolve(SessionKey(6)), SessionTag(2));
        assert_eq!(registry.resolve(SessionKey(7)), SessionTag(3));
        assert!(registry.is_registered(SessionTag(3)));
        assert!(!registry.is_registered(SessionTag(4)));
    }

    #[test]
    fn test_closure_policy_is_folded_into_range() {
        let registry = SessionRegistry::new(2, Arc::new(|key: SessionKey, _width: usize| {
            key.0 as usize + 10
        }))
        .unwrap();
        assert_eq!(registry.slot(SessionKey(1)), 1);
        assert_eq!(registry.slot(SessionKey(0)), 0);
    }

    #[test]
    fn test_single_slot_shares_everything() {
        let registry = SessionRegistry::new(1, Arc::new(ModuloPartition)).unwrap();
        assert_eq!(registry.resolve(SessionKey(1)), registry.resolve(SessionKey(2)));
    }

    #[test]
    fn test_rejects_widths_without_distinct_tags() {
        assert!(SessionRegistry::new(0, Arc::new(ModuloPartition)).is_err());
        assert!(SessionRegistry::new(MAX_SESSION_SLOTS + 1, Arc::new(ModuloPartition)).is_err());

        let widest = SessionRegistry::new(MAX_SESSION_SLOTS, Arc::new(ModuloPartition)).unwrap();
        let last = SessionKey(MAX_SESSION_SLOTS as u64 - 1);
        assert_eq!(widest.resolve(last), SessionTag(u16::MAX - 1));
        assert_ne!(widest.resolve(last), widest.resolve(SessionKey(0)));
    }
}
