//! Event reader and writer parameters.

use crate::ecs::{
    event::{Event, Queue},
    system::{command::CommandBuffer, param::Parameter},
    world,
};

/// Observe the retained window of an event queue.
///
/// Readers see both halves of the double buffer: events written last tick
/// followed by events written this tick.
pub struct EventReader<'w, E: Event> {
    queue: &'w Queue<E>,
}

impl<'w, E: Event> EventReader<'w, E> {
    /// Iterate the retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.queue.iter()
    }

    /// The number of retained events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E: Event> Parameter for EventReader<'_, E> {
    type Value<'w> = EventReader<'w, E>;

    fn init(world: &mut world::World) {
        world.register_event::<E>();
    }

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_event_read(world.types().token::<E>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        EventReader {
            queue: shard
                .events()
                .queue::<E>()
                .expect("event queue registered at system creation"),
        }
    }
}

/// Append events to the newer half of a queue.
pub struct EventWriter<'w, E: Event> {
    queue: &'w mut Queue<E>,
}

impl<'w, E: Event> EventWriter<'w, E> {
    /// Append an event. It is visible to readers immediately and for one
    /// more tick.
    pub fn send(&mut self, event: E) {
        self.queue.send(event);
    }
}

impl<E: Event> Parameter for EventWriter<'_, E> {
    type Value<'w> = EventWriter<'w, E>;

    fn init(world: &mut world::World) {
        world.register_event::<E>();
    }

    fn access(world: &world::World) -> world::Access {
        let mut access = world::Access::new();
        access.add_event_write(world.types().token::<E>());
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        EventWriter {
            queue: shard
                .event_queue_mut::<E>()
                .expect("event queue registered at system creation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use cadence_macros::Event;

    use super::*;
    use crate::ecs::world::World;

    #[derive(Event, Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[test]
    fn writer_appends_reader_observes() {
        // Given
        let mut world = World::new();
        <EventWriter<Ping> as Parameter>::init(&mut world);
        let buffer = CommandBuffer::new();

        // When
        {
            let mut shard = world.shard();
            let mut writer =
                unsafe { <EventWriter<Ping> as Parameter>::extract(&mut shard, &buffer) };
            writer.send(Ping(1));
        }

        // Then
        let mut shard = world.shard();
        let reader = unsafe { <EventReader<Ping> as Parameter>::extract(&mut shard, &buffer) };
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.iter().next(), Some(&Ping(1)));
    }

    #[test]
    fn init_creates_the_queue() {
        let mut world = World::new();

        <EventReader<Ping> as Parameter>::init(&mut world);

        assert!(world.events().is_registered::<Ping>());
    }

    #[test]
    fn writer_conflicts_with_reader_of_same_event() {
        let world = World::new();

        let write = <EventWriter<Ping> as Parameter>::access(&world);
        let read = <EventReader<Ping> as Parameter>::access(&world);

        assert!(write.conflicts_with(&read));
        assert!(!read.conflicts_with(&read.clone()));
    }
}
