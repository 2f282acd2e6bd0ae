//! Entity identifiers and allocation.
//!
//! Entities are opaque handles combining an [`Id`] and a [`Generation`]. The
//! id names a slot; the generation counts how many times the slot has been
//! reused, so stale handles to a despawned entity can be detected instead of
//! silently aliasing a newer one.
//!
//! ```rust,ignore
//! let entity = allocator.alloc(); // Entity { id: 0, generation: 0 }
//! allocator.free(entity);
//! let reused = allocator.alloc(); // Entity { id: 0, generation: 1 }
//! // The original handle no longer matches the live entity.
//! ```
//!
//! The allocator hands out ids from deferred command recording on worker
//! threads, so allocation is atomic: a relaxed counter for fresh ids and a
//! lock-free dead pool for recycled ones.

use std::sync::atomic::{AtomicU32, Ordering};

use crossbeam::queue::SegQueue;

/// The generation of an entity slot, incremented on each reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    /// The first generation of a slot.
    pub(crate) const FIRST: Self = Self(0);

    /// Get the next generation from the current.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// An entity slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// An opaque entity handle: slot id plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    id: Id,
    generation: Generation,
}

impl Entity {
    /// Construct an entity with a known id and generation.
    #[inline]
    pub(crate) const fn new_with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Get the slot id of this entity.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the generation of this entity.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the index of this entity for indexable storage.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }

    /// A handle to the same slot at the next generation.
    #[inline]
    pub(crate) fn genned(&self) -> Self {
        Self::new_with_generation(self.id, self.generation.next())
    }
}

/// Allocator for entity handles.
///
/// Freed entities land in a dead pool with their generation already bumped;
/// allocation prefers the pool to keep the id space compact. All operations
/// take `&self` because command recording allocates concurrently from worker
/// threads.
#[derive(Default, Debug)]
pub struct Allocator {
    /// Freed entities available for reuse, generation pre-incremented.
    dead_pool: SegQueue<Entity>,

    /// The next fresh slot id.
    next_id: AtomicU32,
}

impl Allocator {
    /// Construct a new allocator starting from slot 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an entity, reusing a freed slot when one is available.
    pub fn alloc(&self) -> Entity {
        self.dead_pool.pop().unwrap_or_else(|| {
            let id = Id(self.next_id.fetch_add(1, Ordering::Relaxed));
            Entity::new_with_generation(id, Generation::FIRST)
        })
    }

    /// Return an entity's slot for reuse, invalidating existing handles.
    pub fn free(&self, entity: Entity) {
        self.dead_pool.push(entity.genned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_produces_sequential_ids() {
        // Given
        let allocator = Allocator::new();

        // When
        let first = allocator.alloc();
        let second = allocator.alloc();

        // Then
        assert_ne!(first, second);
        assert_eq!(first.generation(), Generation::FIRST);
        assert_eq!(second.generation(), Generation::FIRST);
    }

    #[test]
    fn freed_slots_are_reused_with_bumped_generation() {
        // Given
        let allocator = Allocator::new();
        let entity = allocator.alloc();

        // When
        allocator.free(entity);
        let reused = allocator.alloc();

        // Then
        assert_eq!(reused.id(), entity.id());
        assert_eq!(reused.generation(), entity.generation().next());
        assert_ne!(reused, entity);
    }

    #[test]
    fn alloc_is_usable_from_shared_references() {
        let allocator = std::sync::Arc::new(Allocator::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = std::sync::Arc::clone(&allocator);
                std::thread::spawn(move || allocator.alloc())
            })
            .collect();

        let mut entities: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        entities.sort();
        entities.dedup();
        assert_eq!(entities.len(), 4);
    }
}
