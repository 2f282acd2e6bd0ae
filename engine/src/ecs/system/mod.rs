//! System callables and conversion from plain functions.
//!
//! A [`System`] packages a user function with the [`Access`] descriptor
//! derived from its parameter list. Functions become systems through
//! [`IntoSystem`], which the parameter-extraction machinery in
//! [`function`] implements for any function whose parameters all implement
//! [`Parameter`]:
//!
//! ```rust,ignore
//! fn movement(query: Query<(&Velocity, &mut Position)>) {
//!     for (vel, pos) in query {
//!         pos.x += vel.dx;
//!     }
//! }
//!
//! let system = IntoSystem::into_system(movement, &mut world);
//! ```
//!
//! Systems are synchronous and run to completion; from the scheduler's point
//! of view they are opaque callables with a declared data footprint.

pub mod command;
pub mod function;
pub mod param;

use crate::ecs::world;

pub use command::{Command, CommandBuffer};
pub use param::Parameter;

/// A schedulable unit of work with a declared data footprint.
pub struct System {
    /// The function's type name, for logs and error reports.
    name: &'static str,

    /// Everything the system reads and writes.
    access: world::Access,

    /// The boxed callable.
    run: Box<dyn FnMut(&mut world::Shard<'_>, &CommandBuffer) + Send + Sync>,
}

impl System {
    /// Create a system from a callable and its access descriptor.
    pub fn new(
        name: &'static str,
        access: world::Access,
        run: impl FnMut(&mut world::Shard<'_>, &CommandBuffer) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            access,
            run: Box::new(run),
        }
    }

    /// The system's display name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The system's access descriptor. Immutable after construction.
    #[inline]
    pub fn access(&self) -> &world::Access {
        &self.access
    }

    /// Execute the system against a shard.
    ///
    /// # Safety
    ///
    /// The caller must ensure no system whose descriptor conflicts with this
    /// one is executing concurrently. Parameter extraction creates aliased
    /// world pointers inside the shard; that is sound only while the
    /// descriptors of all in-flight systems are pairwise compatible, which is
    /// the stage runner's dispatch invariant.
    pub unsafe fn run(&mut self, shard: &mut world::Shard<'_>, buffer: &CommandBuffer) {
        (self.run)(shard, buffer);
    }
}

/// Conversion of a value (usually a function) into a [`System`].
///
/// The `Marker` parameter lets distinct blanket implementations coexist; it
/// never appears in user code.
pub trait IntoSystem<Marker = ()>: Sized {
    /// Convert the instance into a system, registering whatever its
    /// parameters need (type tokens, component columns, event queues) on the
    /// world.
    fn into_system(instance: Self, world: &mut world::World) -> System;
}
