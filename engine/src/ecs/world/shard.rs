//! Worker-side world access.

use std::marker::PhantomData;

use crate::ecs::{
    entity,
    event::{Event, Events, Queue},
    resource::Resource,
    state::States,
    world::{World, registry::TypeRegistry},
};

/// A movable view of the world handed to a running system.
///
/// A shard is a thin pointer to the world that can be sent to a worker
/// thread. It carries no access rights of its own; all interactions must stay
/// within the access descriptor of the system the shard was created for. The
/// stage runner enforces that discipline by never letting two systems with
/// conflicting descriptors be in flight together, which is what makes the
/// aliased world pointers inside concurrent shards sound.
pub struct Shard<'w> {
    /// The world this shard views. Every access must be covered by the
    /// owning system's descriptor.
    world: *mut World,

    _marker: PhantomData<&'w World>,
}

// SAFETY: Shards move to worker threads. The data they reach is Send + Sync
// (enforced by the Component/Resource/Event marker bounds), and disjointness
// between concurrently live shards is guaranteed by the dispatcher's conflict
// checks.
unsafe impl Send for Shard<'_> {}

impl<'w> Shard<'w> {
    /// Create a shard over the world. Called by `World::shard()` and the
    /// stage runner.
    #[inline]
    pub(crate) const fn new(world: *mut World) -> Self {
        Self {
            world,
            _marker: PhantomData,
        }
    }

    /// The raw world pointer, for query iteration.
    #[inline]
    pub(crate) fn world_ptr(&self) -> *mut World {
        self.world
    }

    /// Borrow the underlying world.
    ///
    /// # Safety
    ///
    /// Reads through the returned reference must be covered by the owning
    /// system's access descriptor; uncovered reads may race with another
    /// worker's writes.
    #[inline]
    pub unsafe fn world(&self) -> &World {
        unsafe { &*self.world }
    }

    /// Mutably borrow the underlying world.
    ///
    /// # Safety
    ///
    /// Writes through the returned reference must be covered by the owning
    /// system's access descriptor.
    #[inline]
    pub unsafe fn world_mut(&mut self) -> &mut World {
        unsafe { &mut *self.world }
    }

    /// The entity allocator. Allocation is atomic and unconstrained by
    /// access descriptors.
    #[inline]
    pub fn allocator(&self) -> &entity::Allocator {
        // SAFETY: The allocator is internally synchronized.
        unsafe { (*self.world).allocator() }
    }

    /// The type-identity registry.
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        // SAFETY: The registry is internally synchronized.
        unsafe { (*self.world).types() }
    }

    /// Borrow a resource. Requires read access to `R` in the owning system's
    /// descriptor.
    #[inline]
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        // SAFETY: Caller's descriptor covers the read; conflicting writers
        // are never in flight concurrently.
        unsafe { (*self.world).resource::<R>() }
    }

    /// Mutably borrow a resource. Requires write access to `R`.
    #[inline]
    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        // SAFETY: Caller's descriptor covers the write; the descriptor makes
        // this system the only one touching `R` right now.
        unsafe { (*self.world).resource_mut::<R>() }
    }

    /// The event registry. Requires read access to the queues touched.
    #[inline]
    pub fn events(&self) -> &Events {
        // SAFETY: Read covered by the caller's event-read set.
        unsafe { (*self.world).events() }
    }

    /// Mutably borrow the queue for event type `E`. Requires write access to
    /// `E`.
    #[inline]
    pub fn event_queue_mut<E: Event>(&mut self) -> Option<&mut Queue<E>> {
        // SAFETY: Write covered by the caller's event-write set.
        unsafe { (*self.world).events_mut().queue_mut::<E>() }
    }

    /// The current value of state `S`. Requires state-read access.
    #[inline]
    pub fn state<S: States>(&self) -> Option<&S> {
        // SAFETY: Current values are only rewritten by the driver's
        // transition pass, which never overlaps system execution.
        unsafe { (*self.world).state::<S>() }
    }

    /// Whether state `S` was inserted after the last transition pass.
    #[inline]
    pub fn state_just_created<S: States>(&self) -> Option<bool> {
        // SAFETY: See `state`.
        unsafe { (*self.world).state_just_created::<S>() }
    }

    /// The mutable next-value slot of state `S`. Requires next-state access.
    #[inline]
    pub fn state_next_mut<S: States>(&mut self) -> Option<&mut S> {
        // SAFETY: Next-state conflicts serialize all writers of `S`.
        unsafe { (*self.world).state_next_mut::<S>() }
    }
}
