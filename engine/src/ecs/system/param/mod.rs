//! System parameters: the capability handles a system may ask for.
//!
//! This module defines the [`Parameter`] trait plus the closed set of
//! capability kinds the scheduler recognises:
//!
//! - [`Commands`] - record deferred structural changes
//! - [`Query`] - iterate entities matching component criteria
//! - [`Res`] / [`ResMut`] - read / write a singleton resource
//! - [`EventReader`] / [`EventWriter`] - observe / append events
//! - [`State`] / [`NextState`] - read current / propose next state
//!
//! # How extraction works
//!
//! A parameter type in a function signature has an elided lifetime
//! (`Query<&Position>` is really `Query<'_, &Position>`). At runtime,
//! [`Parameter::extract`] produces the same type with the shard's lifetime
//! applied - that is the [`Value`](Parameter::Value) generic associated type.
//! The [`function`](super::function) machinery bridges the two with a
//! higher-ranked bound, so user functions never spell out lifetimes.
//!
//! Each parameter also reports its footprint through
//! [`Parameter::access`]; the merged footprint becomes the system's access
//! descriptor, which is what the stage runner uses to keep conflicting
//! systems from overlapping.

mod commands;
mod event;
mod query;
mod res;
mod state;

use crate::ecs::{system::command::CommandBuffer, world};

pub use commands::Commands;
pub use event::{EventReader, EventWriter};
pub use query::{Fetch, Filter, Query};
pub use res::{Res, ResMut};
pub use state::{NextState, State};

/// A type that can be passed as a parameter to a system function.
pub trait Parameter: Sized {
    /// The runtime value type with the shard's lifetime applied.
    ///
    /// The value must itself be a parameter so extraction composes.
    type Value<'w>: Parameter;

    /// Prepare the world for this parameter at system registration time:
    /// allocate type tokens, create component columns, register event queues.
    /// This is what guarantees that everything a descriptor references exists
    /// before the first tick observing it.
    fn init(world: &mut world::World);

    /// The world access this parameter needs.
    fn access(world: &world::World) -> world::Access;

    /// Extract the parameter's value from a shard.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that the owning system's access descriptor
    /// was checked against every concurrently running system. Extraction
    /// creates aliased shard pointers; that is sound only because each
    /// parameter touches disjoint data within one system and the dispatcher
    /// keeps conflicting systems out of flight.
    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        buffer: &'w CommandBuffer,
    ) -> Self::Value<'w>;
}
