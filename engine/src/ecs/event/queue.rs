//! Double-buffered storage for a single event type.

use std::any::Any;

use crate::ecs::event::Event;

/// Double-buffered event queue with two-tick retention.
///
/// The queue keeps two halves. [`send`](Self::send) appends to the *newer*
/// half; [`iter`](Self::iter) yields the *older* half followed by the newer
/// one, preserving send order within each half. [`tick`](Self::tick) clears
/// the older half and demotes the newer half in its place.
///
/// # Thread Safety
///
/// `Queue` itself is not synchronised. The scheduler's conflict rules grant a
/// writer exclusive access to its event type, while readers share access with
/// other readers only, so queues are never mutated concurrently.
pub struct Queue<E: Event> {
    /// Index of the half new events are appended to: 0 or 1.
    newer: usize,

    /// The two halves.
    buffers: [Vec<E>; 2],
}

impl<E: Event> Queue<E> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            newer: 0,
            buffers: [Vec::new(), Vec::new()],
        }
    }

    /// Append an event to the newer half.
    pub fn send(&mut self, event: E) {
        self.buffers[self.newer].push(event);
    }

    /// Iterate over all retained events, older half first.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.buffers[1 - self.newer]
            .iter()
            .chain(self.buffers[self.newer].iter())
    }

    /// The number of retained events across both halves.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers[0].len() + self.buffers[1].len()
    }

    /// Returns `true` if neither half holds an event.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers[0].is_empty() && self.buffers[1].is_empty()
    }

    /// Advance one tick: discard the older half, demote the newer half.
    pub(crate) fn tick(&mut self) {
        let older = 1 - self.newer;
        self.buffers[older].clear();
        self.newer = older;
    }
}

impl<E: Event> Default for Queue<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased interface so [`Events`](super::Events) can hold queues of
/// different event types in one map and tick them together.
pub(crate) trait ErasedQueue: Send + Sync {
    /// Advance the queue by one tick.
    fn tick(&mut self);

    /// The number of retained events.
    fn len(&self) -> usize;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> ErasedQueue for Queue<E> {
    fn tick(&mut self) {
        Queue::tick(self);
    }

    fn len(&self) -> usize {
        Queue::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestEvent {
        value: u32,
    }
    impl Event for TestEvent {}

    fn values(queue: &Queue<TestEvent>) -> Vec<u32> {
        queue.iter().map(|e| e.value).collect()
    }

    #[test]
    fn new_queue_is_empty() {
        let queue = Queue::<TestEvent>::new();

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn sent_events_are_visible_immediately() {
        // Given
        let mut queue = Queue::new();

        // When
        queue.send(TestEvent { value: 1 });

        // Then: the newer half is part of the readable window
        assert_eq!(values(&queue), vec![1]);
    }

    #[test]
    fn events_survive_exactly_one_tick() {
        // Given
        let mut queue = Queue::new();
        queue.send(TestEvent { value: 1 });

        // When
        queue.tick();

        // Then: still visible from the older half
        assert_eq!(values(&queue), vec![1]);

        // And when a second tick passes
        queue.tick();

        // Then: gone
        assert!(queue.is_empty());
    }

    #[test]
    fn reader_sees_older_half_before_newer() {
        // Given: "a" written one tick ago, "b" written this tick
        let mut queue = Queue::new();
        queue.send(TestEvent { value: 1 });
        queue.tick();
        queue.send(TestEvent { value: 2 });

        // Then
        assert_eq!(values(&queue), vec![1, 2]);
    }

    #[test]
    fn rolling_window_over_three_ticks() {
        let mut queue = Queue::new();

        // Tick 1: "a"
        queue.send(TestEvent { value: 1 });
        assert_eq!(values(&queue), vec![1]);
        queue.tick();

        // Tick 2: "b"
        queue.send(TestEvent { value: 2 });
        assert_eq!(values(&queue), vec![1, 2]);
        queue.tick();

        // Tick 3: "c" - "a" has aged out
        queue.send(TestEvent { value: 3 });
        assert_eq!(values(&queue), vec![2, 3]);
    }

    #[test]
    fn send_order_is_preserved_within_a_tick() {
        let mut queue = Queue::new();

        queue.send(TestEvent { value: 1 });
        queue.send(TestEvent { value: 2 });
        queue.send(TestEvent { value: 3 });

        assert_eq!(values(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn erased_queue_tick_and_len() {
        let mut queue = Queue::new();
        queue.send(TestEvent { value: 7 });

        let erased: &mut dyn ErasedQueue = &mut queue;
        assert_eq!(erased.len(), 1);
        erased.tick();
        erased.tick();
        assert_eq!(erased.len(), 0);
    }
}
