//! Singleton resources keyed by type.
//!
//! A resource is a process-wide value with exactly one instance per type:
//! global settings, counters, service handles. Resources live in a
//! type-indexed map and are accessed from systems through the
//! [`Res`](crate::ecs::system::param::Res) and
//! [`ResMut`](crate::ecs::system::param::ResMut) parameters.
//!
//! A resource that was never inserted is not an error: parameter views come
//! back empty and reads return `None`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_macros::Resource;
//!
//! #[derive(Resource)]
//! struct Gravity(f32);
//!
//! world.insert_resource(Gravity(-9.8));
//! assert_eq!(world.resource::<Gravity>().unwrap().0, -9.8);
//! ```

use std::{any::Any, any::TypeId as StdTypeId, collections::HashMap};

/// A singleton value keyed by its type.
///
/// Use `#[derive(Resource)]` from `cadence_macros`.
///
/// # Trait Bounds
///
/// - `'static`: no borrowed data
/// - `Send + Sync`: resources are read and written from worker threads
pub trait Resource: Send + Sync + 'static {}

/// Type-indexed map of resource singletons.
#[derive(Default)]
pub(crate) struct Resources {
    values: HashMap<StdTypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    /// Insert a resource, replacing any existing instance of the same type.
    pub fn insert<R: Resource>(&mut self, value: R) {
        self.values.insert(StdTypeId::of::<R>(), Box::new(value));
    }

    /// Insert the default instance if the type is not present yet.
    pub fn init<R: Resource + Default>(&mut self) {
        self.values
            .entry(StdTypeId::of::<R>())
            .or_insert_with(|| Box::new(R::default()));
    }

    /// Remove a resource, returning it if present.
    pub fn remove<R: Resource>(&mut self) -> Option<R> {
        self.values
            .remove(&StdTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    /// Remove a resource by its erased type identity.
    pub fn remove_erased(&mut self, type_id: StdTypeId) {
        self.values.remove(&type_id);
    }

    /// Returns `true` if an instance of `R` is present.
    pub fn contains<R: Resource>(&self) -> bool {
        self.values.contains_key(&StdTypeId::of::<R>())
    }

    /// Borrow the resource of type `R`.
    pub fn get<R: Resource>(&self) -> Option<&R> {
        self.values
            .get(&StdTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<R>())
    }

    /// Mutably borrow the resource of type `R`.
    pub fn get_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.values
            .get_mut(&StdTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_mut::<R>())
    }
}
