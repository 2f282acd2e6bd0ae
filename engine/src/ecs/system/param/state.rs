//! State view parameters.
//!
//! [`State`] reads the current value of an application state; [`NextState`]
//! proposes the value for the next transition pass. Proposals never take
//! effect mid-tick - the driver's transition pass copies `next` into
//! `current` between stages, which is also when `OnExit`/`OnEnter` stages
//! fire.
//!
//! A state type that was never inserted yields empty views, mirroring how
//! missing resources behave.

use crate::ecs::{
    state::States,
    system::{command::CommandBuffer, param::Parameter},
    world,
};

/// Read-only view of a state's current value.
pub struct State<'w, S: States> {
    current: Option<&'w S>,
    just_created: bool,
}

impl<'w, S: States> State<'w, S> {
    /// The current value, or `None` if the state was never inserted.
    #[inline]
    pub fn get(&self) -> Option<&S> {
        self.current
    }

    /// Returns `true` if the current value equals `value`.
    #[inline]
    pub fn is(&self, value: &S) -> bool {
        self.current == Some(value)
    }

    /// Returns `true` if the state was inserted after the last transition
    /// pass.
    #[inline]
    pub fn just_created(&self) -> bool {
        self.just_created
    }
}

impl<S: States> Parameter for State<'_, S> {
    type Value<'w> = State<'w, S>;

    fn init(_world: &mut world::World) {}

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_state_read(world.types().token::<S>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        State {
            just_created: shard.state_just_created::<S>().unwrap_or(false),
            current: shard.state::<S>(),
        }
    }
}

/// Propose the next value of a state.
pub struct NextState<'w, S: States> {
    slot: Option<&'w mut S>,
}

impl<'w, S: States> NextState<'w, S> {
    /// Returns `true` if the state exists.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.slot.is_some()
    }

    /// Propose `value` for the next transition pass. Lost if the state was
    /// never inserted.
    pub fn set(&mut self, value: S) {
        if let Some(slot) = self.slot.as_deref_mut() {
            *slot = value;
        }
    }
}

impl<S: States> Parameter for NextState<'_, S> {
    type Value<'w> = NextState<'w, S>;

    fn init(_world: &mut world::World) {}

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_state_next(world.types().token::<S>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        NextState {
            slot: shard.state_next_mut::<S>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use cadence_macros::States;

    use super::*;
    use crate::ecs::world::World;

    #[derive(States, Clone, PartialEq, Eq, Hash, Debug, Default)]
    enum Phase {
        #[default]
        Boot,
        Ready,
    }

    #[test]
    fn state_view_reads_current() {
        // Given
        let mut world = World::new();
        world.init_state::<Phase>();
        let buffer = CommandBuffer::new();
        let mut shard = world.shard();

        // When
        let view = unsafe { <State<Phase> as Parameter>::extract(&mut shard, &buffer) };

        // Then
        assert!(view.is(&Phase::Boot));
        assert!(view.just_created());
    }

    #[test]
    fn missing_state_views_are_empty() {
        let mut world = World::new();
        let buffer = CommandBuffer::new();
        let mut shard = world.shard();

        let view = unsafe { <State<Phase> as Parameter>::extract(&mut shard, &buffer) };

        assert!(view.get().is_none());
        assert!(!view.just_created());
    }

    #[test]
    fn next_state_proposal_lands_at_transition() {
        // Given
        let mut world = World::new();
        world.init_state::<Phase>();

        // When
        {
            let buffer = CommandBuffer::new();
            let mut shard = world.shard();
            let mut next =
                unsafe { <NextState<Phase> as Parameter>::extract(&mut shard, &buffer) };
            next.set(Phase::Ready);
        }

        // Then: not visible until the pass runs
        assert_eq!(world.state::<Phase>(), Some(&Phase::Boot));
        world.apply_state_transitions();
        assert_eq!(world.state::<Phase>(), Some(&Phase::Ready));
    }

    #[test]
    fn next_writers_conflict_readers_do_not() {
        let world = World::new();

        let read = <State<Phase> as Parameter>::access(&world);
        let write = <NextState<Phase> as Parameter>::access(&world);

        assert!(!read.conflicts_with(&read.clone()));
        assert!(!read.conflicts_with(&write));
        assert!(write.conflicts_with(&write.clone()));
    }
}
