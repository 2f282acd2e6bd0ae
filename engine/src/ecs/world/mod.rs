//! The world: entities, components, resources, events, and states.
//!
//! A [`World`] owns everything the scheduler operates on. Systems never hold
//! the world directly; they receive capability handles (queries, resource
//! views, event readers/writers, state views) extracted from a [`Shard`] by
//! the parameter machinery, and the stage runner guarantees through access
//! descriptors that concurrently running systems touch disjoint data.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut world = World::new();
//!
//! let entity = world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//! world.insert_resource(Gravity(-9.8));
//!
//! assert!(world.contains(entity));
//! world.despawn(entity);
//! ```

pub mod access;
pub mod registry;
mod shard;

use std::{collections::BTreeMap, marker::PhantomData};

use crate::ecs::{
    component::{Bundle, Component},
    entity,
    event::{Event, Events},
    resource::{Resource, Resources},
    state::{StateStore, States, Transition},
    storage::Storage,
};

pub use access::{Access, QueryAccess, TypeSet};
pub use registry::{TypeRegistry, TypeToken};
pub use shard::Shard;

/// The central container for all scheduled data.
pub struct World {
    /// Live entities and their current generation.
    alive: BTreeMap<entity::Id, entity::Generation>,

    /// Entity handle allocator, shared with command recording.
    allocator: entity::Allocator,

    /// Type-identity tokens for every typed concern.
    types: TypeRegistry,

    /// Component columns.
    storage: Storage,

    /// Singleton resources.
    resources: Resources,

    /// Event queues.
    events: Events,

    /// Application states.
    states: StateStore,

    /// Marker to make World !Send. The world stays on the driver thread;
    /// workers reach it only through [`Shard`]s.
    _not_send: PhantomData<*mut ()>,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            alive: BTreeMap::new(),
            allocator: entity::Allocator::new(),
            types: TypeRegistry::new(),
            storage: Storage::default(),
            resources: Resources::default(),
            events: Events::new(),
            states: StateStore::default(),
            _not_send: PhantomData,
        }
    }

    /// The type-identity registry.
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The entity allocator.
    #[inline]
    pub fn allocator(&self) -> &entity::Allocator {
        &self.allocator
    }

    // ==================== Entities & components ====================

    /// Spawn a new entity with the given bundle of components.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> entity::Entity {
        let entity = self.allocator.alloc();
        self.spawn_reserved(entity, bundle);
        entity
    }

    /// Spawn a pre-allocated entity, as used by deferred command flush.
    pub(crate) fn spawn_reserved<B: Bundle>(&mut self, entity: entity::Entity, bundle: B) {
        B::register(self);
        self.alive.insert(entity.id(), entity.generation());
        bundle.install(self, entity);
    }

    /// Despawn an entity, dropping all of its components.
    ///
    /// Stale handles (already despawned, or from a previous generation of the
    /// slot) are ignored.
    pub fn despawn(&mut self, entity: entity::Entity) {
        if self.alive.get(&entity.id()) != Some(&entity.generation()) {
            return;
        }
        self.alive.remove(&entity.id());
        self.storage.despawn(entity.id());
        self.allocator.free(entity);
    }

    /// Returns `true` if the handle refers to a live entity.
    pub fn contains(&self, entity: entity::Entity) -> bool {
        self.alive.get(&entity.id()) == Some(&entity.generation())
    }

    /// The number of live entities.
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Iterate over all live entities in slot order.
    pub(crate) fn iter_entities(&self) -> impl Iterator<Item = entity::Entity> + '_ {
        self.alive
            .iter()
            .map(|(id, generation)| entity::Entity::new_with_generation(*id, *generation))
    }

    /// Attach a bundle of components to a live entity.
    ///
    /// Does nothing for stale handles.
    pub fn insert<B: Bundle>(&mut self, entity: entity::Entity, bundle: B) {
        if !self.contains(entity) {
            return;
        }
        B::register(self);
        bundle.install(self, entity);
    }

    /// Detach components by token from a live entity.
    pub(crate) fn remove_tokens(&mut self, entity: entity::Entity, tokens: &[TypeToken]) {
        if !self.contains(entity) {
            return;
        }
        for &token in tokens {
            self.storage.remove(token, entity.id());
        }
    }

    /// Detach the components of bundle type `B` from a live entity.
    pub fn remove<B: Bundle>(&mut self, entity: entity::Entity) {
        let tokens = B::tokens(&self.types);
        self.remove_tokens(entity, &tokens);
    }

    /// Register component type `C`: allocate its token and its column.
    pub fn register_component<C: Component>(&mut self) -> TypeToken {
        let token = self.types.token::<C>();
        self.storage.ensure_column::<C>(token);
        token
    }

    /// Write a single component value for a (live) entity.
    pub(crate) fn write_component<C: Component>(&mut self, entity: entity::Entity, value: C) {
        let token = self.types.token::<C>();
        self.storage.insert(token, entity.id(), value);
    }

    /// Borrow a component of a live entity.
    pub fn get<C: Component>(&self, entity: entity::Entity) -> Option<&C> {
        if !self.contains(entity) {
            return None;
        }
        self.component_by_id(entity.id())
    }

    /// Mutably borrow a component of a live entity.
    pub fn get_mut<C: Component>(&mut self, entity: entity::Entity) -> Option<&mut C> {
        if !self.contains(entity) {
            return None;
        }
        let token = self.types.get::<C>()?;
        self.storage.get_mut(token, entity.id())
    }

    /// Borrow a component by entity slot id, without a generation check.
    pub(crate) fn component_by_id<C: Component>(&self, id: entity::Id) -> Option<&C> {
        let token = self.types.get::<C>()?;
        self.storage.get(token, id)
    }

    /// Mutably borrow a component by entity slot id, without a generation
    /// check.
    pub(crate) fn component_by_id_mut<C: Component>(&mut self, id: entity::Id) -> Option<&mut C> {
        let token = self.types.get::<C>()?;
        self.storage.get_mut(token, id)
    }

    /// Returns `true` if the entity slot has a value in the token's column.
    pub(crate) fn has_token(&self, token: TypeToken, id: entity::Id) -> bool {
        self.storage.contains(token, id)
    }

    // ==================== Resources ====================

    /// Insert a resource, replacing any existing instance.
    pub fn insert_resource<R: Resource>(&mut self, value: R) {
        self.types.token::<R>();
        self.resources.insert(value);
    }

    /// Insert the default instance of `R` if none exists.
    pub fn init_resource<R: Resource + Default>(&mut self) {
        self.types.token::<R>();
        self.resources.init::<R>();
    }

    /// Remove the resource of type `R`, returning it.
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Remove a resource by erased type identity.
    pub(crate) fn remove_resource_erased(&mut self, type_id: std::any::TypeId) {
        self.resources.remove_erased(type_id);
    }

    /// Returns `true` if a resource of type `R` exists.
    pub fn contains_resource<R: Resource>(&self) -> bool {
        self.resources.contains::<R>()
    }

    /// Borrow the resource of type `R`.
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    /// Mutably borrow the resource of type `R`.
    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    // ==================== Events ====================

    /// Register event type `E`, creating its queue.
    pub fn register_event<E: Event>(&mut self) {
        self.types.token::<E>();
        self.events.register::<E>();
    }

    /// The event registry.
    #[inline]
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// The mutable event registry.
    #[inline]
    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    // ==================== States ====================

    /// Insert state `S` with the given initial value.
    ///
    /// Does nothing if the state already exists.
    pub fn insert_state<S: States>(&mut self, value: S) {
        self.types.token::<S>();
        self.states.insert(value);
    }

    /// Insert state `S` with its default value.
    pub fn init_state<S: States + Default>(&mut self) {
        self.insert_state(S::default());
    }

    /// Returns `true` if state `S` has been inserted.
    pub fn contains_state<S: States>(&self) -> bool {
        self.states.contains::<S>()
    }

    /// The current value of state `S`.
    pub fn state<S: States>(&self) -> Option<&S> {
        self.states.current::<S>()
    }

    /// Whether state `S` was inserted after the last transition pass.
    pub fn state_just_created<S: States>(&self) -> Option<bool> {
        self.states.just_created::<S>()
    }

    /// The mutable next-value slot of state `S`.
    pub(crate) fn state_next_mut<S: States>(&mut self) -> Option<&mut S> {
        self.states.next_mut::<S>()
    }

    /// Propose the next value of state `S` from outside a system.
    ///
    /// The proposal lands at the next transition pass, exactly as if a
    /// system had set it through `NextState`.
    pub fn set_next_state<S: States>(&mut self, value: S) {
        if let Some(slot) = self.states.next_mut::<S>() {
            *slot = value;
        }
    }

    /// Run the state transition pass, reporting completed transitions.
    pub(crate) fn apply_state_transitions(&mut self) -> Vec<Transition> {
        self.states.apply_all()
    }

    // ==================== Shards ====================

    /// Create a shard over this world for parameter extraction.
    ///
    /// The caller is responsible for only extracting data the dispatch
    /// discipline has cleared: shards created for concurrently running
    /// systems must carry non-conflicting access descriptors.
    pub fn shard(&mut self) -> Shard<'_> {
        Shard::new(self as *mut World)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
