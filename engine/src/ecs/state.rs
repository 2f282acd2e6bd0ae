//! Application states with buffered transitions.
//!
//! A state is a small value (typically an enum) with a *current* and a *next*
//! slot plus a `just_created` flag. Systems read the current value through
//! the [`State`](crate::ecs::system::param::State) parameter and propose a
//! new value through [`NextState`](crate::ecs::system::param::NextState);
//! the proposal only takes effect when the driver runs the transition pass,
//! which copies `next` into `current`, clears `just_created`, and reports the
//! change so the matching `OnExit`/`OnEnter` stages can run.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_macros::States;
//!
//! #[derive(States, Clone, PartialEq, Eq, Hash, Debug)]
//! enum GameState {
//!     Menu,
//!     Playing,
//! }
//!
//! fn start_game(mut next: NextState<GameState>) {
//!     next.set(GameState::Playing);
//! }
//! ```

use std::{
    any::{Any, TypeId as StdTypeId},
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
};

/// A state value.
///
/// Use `#[derive(States)]` from `cadence_macros`, together with the required
/// `Clone`, `PartialEq`, `Eq`, `Hash`, and `Debug` derives.
pub trait States: Clone + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// A completed state change, reported by the transition pass.
///
/// Carries the type identity of the state plus stable hashes of the value
/// left and the value entered, which is exactly what the driver needs to
/// address the `OnExit`/`OnEnter` stage ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state type that changed.
    pub state: StdTypeId,

    /// Value hash of the state that was left.
    pub exited: u64,

    /// Value hash of the state that was entered.
    pub entered: u64,
}

/// A stable per-process hash of a state value, used to key `OnEnter`/`OnExit`
/// stages by value without boxing the value into the stage id.
pub(crate) fn state_hash<S: States>(value: &S) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Storage for one state type.
struct Entry<S: States> {
    current: S,
    next: S,
    just_created: bool,
}

/// Type-erased interface over a state entry so the store can hold entries of
/// different state types and run the transition pass over all of them.
trait ErasedEntry: Send + Sync {
    /// Copy `next` into `current` and clear `just_created`. Returns the
    /// transition if the value changed.
    fn apply(&mut self) -> Option<Transition>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: States> ErasedEntry for Entry<S> {
    fn apply(&mut self) -> Option<Transition> {
        self.just_created = false;
        if self.next == self.current {
            return None;
        }
        let exited = state_hash(&self.current);
        let entered = state_hash(&self.next);
        self.current = self.next.clone();
        Some(Transition {
            state: StdTypeId::of::<S>(),
            exited,
            entered,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of all inserted states.
#[derive(Default)]
pub(crate) struct StateStore {
    entries: HashMap<StdTypeId, Box<dyn ErasedEntry>>,
}

impl StateStore {
    /// Insert a state with the given initial value.
    ///
    /// If the state type already exists, nothing happens.
    pub fn insert<S: States>(&mut self, value: S) {
        self.entries
            .entry(StdTypeId::of::<S>())
            .or_insert_with(|| {
                Box::new(Entry {
                    current: value.clone(),
                    next: value,
                    just_created: true,
                })
            });
    }

    /// Returns `true` if state type `S` has been inserted.
    pub fn contains<S: States>(&self) -> bool {
        self.entries.contains_key(&StdTypeId::of::<S>())
    }

    fn entry<S: States>(&self) -> Option<&Entry<S>> {
        self.entries
            .get(&StdTypeId::of::<S>())?
            .as_any()
            .downcast_ref::<Entry<S>>()
    }

    fn entry_mut<S: States>(&mut self) -> Option<&mut Entry<S>> {
        self.entries
            .get_mut(&StdTypeId::of::<S>())?
            .as_any_mut()
            .downcast_mut::<Entry<S>>()
    }

    /// The current value of state `S`.
    pub fn current<S: States>(&self) -> Option<&S> {
        self.entry::<S>().map(|entry| &entry.current)
    }

    /// Whether state `S` was inserted after the last transition pass.
    pub fn just_created<S: States>(&self) -> Option<bool> {
        self.entry::<S>().map(|entry| entry.just_created)
    }

    /// The mutable next-value slot of state `S`.
    pub fn next_mut<S: States>(&mut self) -> Option<&mut S> {
        self.entry_mut::<S>().map(|entry| &mut entry.next)
    }

    /// Run the transition pass over every state, collecting completed
    /// transitions.
    pub fn apply_all(&mut self) -> Vec<Transition> {
        self.entries
            .values_mut()
            .filter_map(|entry| entry.apply())
            .collect()
    }
}
