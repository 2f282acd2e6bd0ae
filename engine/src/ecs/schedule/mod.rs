//! System scheduling: nodes, ordering, conditions, and the stage runner.
//!
//! Registered systems become [`Node`]s in an arena owned by the app; ordering
//! constraints (explicit `before`/`after` edges and [`SystemSet`] ordering)
//! become `user_before` edges between node ids. Each stage owns a [`Runner`]
//! that executes its nodes once per tick with conflict-aware parallelism.

pub mod condition;
pub mod node;
pub mod runner;
pub mod set;

use thiserror::Error;

pub use condition::{Condition, in_state};
pub use node::{Node, SystemId};
pub use runner::Runner;
pub use set::{SetRegistry, SystemSet};

/// Errors surfaced by registration and stage execution.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Registering a system or configuring a set order produced a cycle in
    /// the same-stage ordering graph. Fatal at registration time; the
    /// offending registration is rolled back.
    #[error("ordering cycle through system `{system}`")]
    CycleDetected {
        /// The display name of the system whose registration closed the
        /// cycle.
        system: String,
    },

    /// The worker pool shut down while a stage was running. The stage
    /// finished its in-flight work; the driver proceeds to the exit
    /// sequence.
    #[error("worker pool shut down during stage execution")]
    PoolShutdown,
}
