//! Event queues with two-tick retention.
//!
//! This module owns all event storage: one [`Queue`] per event type, managed
//! by the type-erased [`Events`] registry. Queues are double-buffered with a
//! *newer* and an *older* half. Writers append to the newer half; readers
//! observe both halves, older entries first. Once per tick the registry
//! advances every queue: the older half is discarded and the newer half
//! becomes the older one.
//!
//! An event written in tick `t` is therefore visible during ticks `t` and
//! `t + 1` and gone in tick `t + 2`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_macros::Event;
//!
//! #[derive(Event, Debug)]
//! struct Damage { amount: u32 }
//!
//! let mut events = Events::default();
//! events.register::<Damage>();
//!
//! events.queue_mut::<Damage>().unwrap().send(Damage { amount: 5 });
//! // Visible immediately (newer half) and for one more tick:
//! assert_eq!(events.queue::<Damage>().unwrap().len(), 1);
//! events.tick_all();
//! assert_eq!(events.queue::<Damage>().unwrap().len(), 1);
//! events.tick_all();
//! assert_eq!(events.queue::<Damage>().unwrap().len(), 0);
//! ```

mod queue;

use std::{any::TypeId as StdTypeId, collections::HashMap};

pub use queue::Queue;

use queue::ErasedQueue;

/// An event payload.
///
/// Use `#[derive(Event)]` from `cadence_macros`.
///
/// # Trait Bounds
///
/// - `'static`: no borrowed data
/// - `Send + Sync`: queues are written from worker threads
pub trait Event: Send + Sync + 'static {}

/// Registry owning one [`Queue`] per registered event type.
///
/// Queues are registered on first mention - either explicitly through
/// [`register`](Self::register) or implicitly when a system declares an
/// `EventReader`/`EventWriter` parameter - so a queue always exists before
/// the first tick that observes it.
#[derive(Default)]
pub struct Events {
    queues: HashMap<StdTypeId, Box<dyn ErasedQueue>>,
}

impl Events {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register event type `E`, creating its queue if it does not exist yet.
    pub fn register<E: Event>(&mut self) {
        self.queues
            .entry(StdTypeId::of::<E>())
            .or_insert_with(|| Box::new(Queue::<E>::new()));
    }

    /// Returns `true` if the event type has a queue.
    #[inline]
    pub fn is_registered<E: Event>(&self) -> bool {
        self.queues.contains_key(&StdTypeId::of::<E>())
    }

    /// Borrow the queue for event type `E`.
    pub fn queue<E: Event>(&self) -> Option<&Queue<E>> {
        let queue = self.queues.get(&StdTypeId::of::<E>())?;
        queue.as_any().downcast_ref::<Queue<E>>()
    }

    /// Mutably borrow the queue for event type `E`.
    pub fn queue_mut<E: Event>(&mut self) -> Option<&mut Queue<E>> {
        let queue = self.queues.get_mut(&StdTypeId::of::<E>())?;
        queue.as_any_mut().downcast_mut::<Queue<E>>()
    }

    /// Advance every queue by one tick.
    ///
    /// Called by the driver once per pass through the main loop, never from
    /// systems.
    pub fn tick_all(&mut self) {
        for queue in self.queues.values_mut() {
            queue.tick();
        }
    }
}
