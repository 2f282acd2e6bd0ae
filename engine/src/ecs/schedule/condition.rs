//! Run conditions: predicates gating a node each tick.
//!
//! A condition is evaluated on the dispatcher thread immediately before a
//! node would be dispatched. A node whose condition fails this tick does not
//! execute, but still counts as done for its successors.
//!
//! ```rust,ignore
//! app.system(Stage::Update, apply_damage)
//!     .run_if(in_state(GameState::Playing))
//!     .register()?;
//! ```

use crate::ecs::{state::States, world::World};

/// A boolean predicate over the world.
pub struct Condition {
    pred: Box<dyn Fn(&World) -> bool + Send + Sync>,
}

impl Condition {
    /// Wrap a predicate.
    ///
    /// The predicate runs on the dispatcher thread while other systems may
    /// be executing; it should limit itself to states and stable resources.
    pub fn new(pred: impl Fn(&World) -> bool + Send + Sync + 'static) -> Self {
        Self {
            pred: Box::new(pred),
        }
    }

    /// Evaluate the predicate.
    pub(crate) fn eval(&self, world: &World) -> bool {
        (self.pred)(world)
    }
}

/// Condition that holds while state `S` equals `value`.
///
/// A state that was never inserted never matches.
pub fn in_state<S: States>(value: S) -> Condition {
    Condition::new(move |world| world.state::<S>() == Some(&value))
}
