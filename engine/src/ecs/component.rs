//! Component types and bundles.
//!
//! A component is a plain value attached to an entity, keyed by its type.
//! The scheduler only reasons about component *type identity*; the actual
//! values live in [`storage`](crate::ecs::storage) columns.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! // Single components and tuples are both bundles:
//! world.spawn(Position { x: 0.0, y: 0.0 });
//! world.spawn((Position { x: 1.0, y: 0.0 }, Velocity { dx: 0.5, dy: 0.0 }));
//! ```

use crate::{
    all_tuples,
    ecs::{
        entity,
        world::{World, registry},
    },
};

/// A value type attachable to entities.
///
/// Use `#[derive(Component)]` from `cadence_macros`.
///
/// # Trait Bounds
///
/// - `'static`: no borrowed data
/// - `Send + Sync`: component columns are mutated from worker threads
pub trait Component: Send + Sync + 'static {}

/// One or more components inserted together.
///
/// Implemented for every [`Component`] and for tuples of bundles, so spawn
/// and insert calls accept `comp`, `(a, b)`, `(a, (b, c))`, and so on.
pub trait Bundle: Send + 'static {
    /// Make sure every component type in the bundle has a registered token
    /// and a storage column.
    fn register(world: &mut World);

    /// The tokens of every component type in the bundle.
    fn tokens(registry: &registry::TypeRegistry) -> Vec<registry::TypeToken>;

    /// Write the bundle's values onto the entity.
    fn install(self, world: &mut World, entity: entity::Entity);
}

impl<C: Component> Bundle for C {
    fn register(world: &mut World) {
        world.register_component::<C>();
    }

    fn tokens(registry: &registry::TypeRegistry) -> Vec<registry::TypeToken> {
        vec![registry.token::<C>()]
    }

    fn install(self, world: &mut World, entity: entity::Entity) {
        world.write_component(entity, self);
    }
}

macro_rules! bundle_tuple {
    ($($name:ident),*) => {
        impl<$($name: Bundle),*> Bundle for ($($name,)*) {
            fn register(world: &mut World) {
                $( $name::register(world); )*
            }

            fn tokens(registry: &registry::TypeRegistry) -> Vec<registry::TypeToken> {
                let mut tokens = Vec::new();
                $( tokens.extend($name::tokens(registry)); )*
                tokens
            }

            fn install(self, world: &mut World, entity: entity::Entity) {
                #[allow(non_snake_case)]
                let ($($name,)*) = self;
                $( $name.install(world, entity); )*
            }
        }
    };
}

all_tuples!(bundle_tuple);
