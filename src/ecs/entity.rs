//! Opaque entity identifiers and the allocator which hands them out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// An opaque 32-bit key identifying a logical object. Entities carry no data
/// themselves, components are attached to them through `ComponentStore`s.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u32);

impl Entity {
    /// The reserved id which never refers to a live entity.
    pub const INVALID: Entity = Entity(0);

    /// Wraps a raw id. Mostly useful for deserialization and tests, live ids
    /// should come from an `EntityAllocator`.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Entity(id)
    }

    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Entity::INVALID
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::INVALID
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

const UNSEEDED: u64 = 0;
const MAX_ID: u64 = ::std::u32::MAX as u64;

/// Generates unique entity ids from a monotonic atomic counter. Ids are never
/// recycled within one seed epoch.
///
/// The counter is 64-bit wide so that exhaustion of the 32-bit id space is
/// detected instead of silently wrapping around.
#[derive(Debug)]
pub struct EntityAllocator {
    next: AtomicU64,
}

impl EntityAllocator {
    /// Creates a new allocator seeded right after `Entity::INVALID`.
    pub fn new() -> Self {
        EntityAllocator::with_seed(Entity::INVALID.0 + 1)
    }

    /// Creates a new allocator whose first id is `seed`.
    pub fn with_seed(seed: u32) -> Self {
        EntityAllocator {
            next: AtomicU64::new(u64::from(seed)),
        }
    }

    /// Creates an allocator that refuses to create entities until `set_seed`
    /// has been called.
    pub const fn unseeded() -> Self {
        EntityAllocator {
            next: AtomicU64::new(UNSEEDED),
        }
    }

    /// Returns a fresh entity.
    ///
    /// Fails with `AllocatorNotSeeded` if the allocator has no seed, and with
    /// `EntityExhausted` once every 32-bit id has been handed out.
    pub fn create(&self) -> Result<Entity> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                if v == UNSEEDED || v > MAX_ID {
                    None
                } else {
                    Some(v + 1)
                }
            })
            .map(|v| Entity(v as u32))
            .map_err(|v| {
                if v == UNSEEDED {
                    Error::AllocatorNotSeeded
                } else {
                    Error::EntityExhausted
                }
            })
    }

    /// Returns the id the next call to `create` would hand out.
    ///
    /// An exhausted allocator reports `u32::MAX` as well, use `is_exhausted`
    /// to tell it apart from one which still has that last id to give.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.next.load(Ordering::Acquire).min(MAX_ID) as u32
    }

    /// Returns true once every 32-bit id has been handed out.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.next.load(Ordering::Acquire) > MAX_ID
    }

    /// Resets the counter. Entities created before the reset may collide with
    /// the ones created after it, so only do this when none of them are
    /// retained. A seed of `0` leaves the allocator unseeded.
    #[inline]
    pub fn set_seed(&self, seed: u32) {
        self.next.store(u64::from(seed), Ordering::Release);
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        EntityAllocator::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sequential() {
        let allocator = EntityAllocator::new();

        let mut last = Entity::INVALID;
        for _ in 0..1000 {
            let e = allocator.create().unwrap();
            assert!(e.is_valid());
            assert!(e > last);
            last = e;
        }

        assert_eq!(last.id(), 1000);
        assert_eq!(allocator.seed(), 1001);
    }

    #[test]
    fn unseeded() {
        let allocator = EntityAllocator::unseeded();
        match allocator.create() {
            Err(Error::AllocatorNotSeeded) => {}
            other => panic!("unexpected {:?}", other),
        }

        allocator.set_seed(1);
        assert_eq!(allocator.create().unwrap(), Entity::new(1));
    }

    #[test]
    fn exhausted() {
        let allocator = EntityAllocator::with_seed(::std::u32::MAX);
        assert!(!allocator.is_exhausted());
        assert_eq!(allocator.create().unwrap().id(), ::std::u32::MAX);
        assert!(allocator.is_exhausted());

        match allocator.create() {
            Err(Error::EntityExhausted) => {}
            other => panic!("unexpected {:?}", other),
        }

        // Stays exhausted instead of wrapping.
        assert!(allocator.create().is_err());
        assert_eq!(allocator.seed(), ::std::u32::MAX);

        allocator.set_seed(1);
        assert!(!allocator.is_exhausted());
    }

    #[test]
    fn reseed() {
        let allocator = EntityAllocator::new();
        allocator.create().unwrap();
        allocator.create().unwrap();

        allocator.set_seed(1);
        assert_eq!(allocator.create().unwrap(), Entity::new(1));
    }
}
