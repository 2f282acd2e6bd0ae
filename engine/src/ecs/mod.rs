pub mod component;
pub mod entity;
pub mod event;
pub mod resource;
pub mod schedule;
pub mod state;
pub(crate) mod storage;
pub mod system;
pub(crate) mod util;
pub mod world;

pub use component::{Bundle, Component};
pub use entity::Entity;
pub use event::Event;
pub use resource::Resource;
pub use state::States;
pub use system::{Parameter, System};
pub use world::World;
