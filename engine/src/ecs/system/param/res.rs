//! Resource view parameters.
//!
//! [`Res`] and [`ResMut`] give systems access to singleton resources. A
//! resource that was never inserted is not an error: the view comes back
//! empty and every read returns `None`, so systems degrade to no-ops instead
//! of failing.
//!
//! # Conflict behaviour
//!
//! - Several `Res<T>` of the same `T` may run concurrently.
//! - `ResMut<T>` serializes against every other access to `T`.
//! - Views of different types never interact.
//!
//! ```rust,ignore
//! #[derive(Resource)]
//! struct Score(u32);
//!
//! fn report(score: Res<Score>) {
//!     if let Some(score) = score.get() {
//!         log::info!("score: {}", score.0);
//!     }
//! }
//!
//! fn award(mut score: ResMut<Score>) {
//!     if let Some(score) = score.get_mut() {
//!         score.0 += 10;
//!     }
//! }
//! ```

use crate::ecs::{
    resource::Resource,
    system::{command::CommandBuffer, param::Parameter},
    world,
};

/// Read-only view of a resource, possibly empty.
pub struct Res<'w, R: Resource> {
    value: Option<&'w R>,
}

impl<'w, R: Resource> Res<'w, R> {
    /// Returns `true` if the resource exists.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the resource, or `None` if it was never inserted.
    #[inline]
    pub fn get(&self) -> Option<&R> {
        self.value
    }
}

impl<R: Resource> Parameter for Res<'_, R> {
    type Value<'w> = Res<'w, R>;

    fn init(_world: &mut world::World) {}

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_resource_ro(world.types().token::<R>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        Res {
            value: shard.resource::<R>(),
        }
    }
}

/// Mutable view of a resource, possibly empty.
pub struct ResMut<'w, R: Resource> {
    value: Option<&'w mut R>,
}

impl<'w, R: Resource> ResMut<'w, R> {
    /// Returns `true` if the resource exists.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the resource, or `None` if it was never inserted.
    #[inline]
    pub fn get(&self) -> Option<&R> {
        self.value.as_deref()
    }

    /// Mutably borrow the resource, or `None` if it was never inserted.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.value.as_deref_mut()
    }
}

impl<R: Resource> Parameter for ResMut<'_, R> {
    type Value<'w> = ResMut<'w, R>;

    fn init(_world: &mut world::World) {}

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_resource_mut(world.types().token::<R>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        ResMut {
            value: shard.resource_mut::<R>(),
        }
    }
}
