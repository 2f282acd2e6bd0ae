//! Staged, conflict-aware ECS application core.
//!
//! `cadence_engine` is the heart of an Entity-Component-System application:
//! a [`World`](ecs::world::World) holding entities, resources, events, and
//! states, plus an [`App`](app::App) driver that runs user *systems* grouped
//! into lifecycle *stages*. Systems declare their data needs through their
//! parameter types; the stage runner derives access descriptors from those
//! parameters and dispatches systems onto a worker pool so that two systems
//! only ever overlap in time when their data access cannot race.
//!
//! # Quick Tour
//!
//! ```rust,ignore
//! use cadence_engine::{App, LoopPlugin, Stage};
//! use cadence_engine::ecs::system::param::{EventWriter, Query, ResMut};
//! use cadence_macros::{Component, Resource};
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Resource)]
//! struct FrameCount(u64);
//!
//! fn advance(query: Query<(&mut Position,)>) {
//!     for (pos,) in query {
//!         pos.x += 1.0;
//!     }
//! }
//!
//! fn count(mut frames: ResMut<FrameCount>) {
//!     if let Some(frames) = frames.get_mut() {
//!         frames.0 += 1;
//!     }
//! }
//!
//! let mut app = App::new();
//! app.add_plugin(LoopPlugin);
//! app.insert_resource(FrameCount(0));
//! app.add_system(Stage::Update, advance).unwrap();
//! app.add_system(Stage::PostUpdate, count).unwrap();
//! app.run();
//! ```
//!
//! # Module Map
//!
//! - [`ecs::world`] - the world container, access descriptors, worker shards
//! - [`ecs::system`] - system callables and parameter extraction
//! - [`ecs::schedule`] - nodes, ordering sets, run conditions, the stage runner
//! - [`ecs::event`] - double-buffered event queues with two-tick retention
//! - [`app`] - stages, plugins, and the startup/loop/exit driver
//! - [`core::tasks`] - the fixed-size worker pool

// The derive macros expand to `cadence_engine::...` paths; alias ourselves so
// they also resolve inside this crate's own tests and examples.
extern crate self as cadence_engine;

pub mod app;
pub mod core;
pub mod ecs;

pub use app::{App, AppExit, LoopPlugin, OnEnter, OnExit, Plugin, Stage, StageId, exit_app};
pub use ecs::schedule::{Condition, ScheduleError, SystemId, in_state};
