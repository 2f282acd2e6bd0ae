//! Entity queries over component criteria.
//!
//! A [`Query`] iterates every live entity matching three criteria:
//!
//! - `G` (*get*): a fetch - `&T`, `&mut T`, [`Entity`], or a tuple of those.
//!   Every fetched type must be present; references are handed to the system.
//! - `W` (*with*): a tuple of component types that must be present but are
//!   not fetched.
//! - `X` (*without*): a tuple of component types that must be absent.
//!
//! ```rust,ignore
//! // Move everything that has a velocity and is not frozen:
//! fn movement(query: Query<(&Velocity, &mut Position), (), (Frozen,)>) {
//!     for (vel, pos) in query {
//!         pos.x += vel.dx;
//!     }
//! }
//! ```
//!
//! Fetched mutably-included, read-only-included, and excluded types all feed
//! the system's access descriptor, so two queries only serialize when they
//! could actually touch the same component of the same entity.

use std::marker::PhantomData;

use crate::{
    all_tuples,
    ecs::{
        component::Component,
        entity::{self, Entity},
        system::{command::CommandBuffer, param::Parameter},
        world::{self, QueryAccess, TypeSet, World},
    },
};

/// Data fetched for each matching entity.
pub trait Fetch {
    /// The item handed to the system, with the shard's lifetime applied.
    type Item<'a>;

    /// Register component tokens and columns at system registration.
    fn init(world: &mut World);

    /// Contribute this fetch's component types to the query triple.
    fn collect(query: &mut QueryAccess, world: &World);

    /// Returns `true` if the entity slot carries every fetched component.
    fn matches(world: &World, id: entity::Id) -> bool;

    /// Produce the item for a matched entity.
    ///
    /// # Safety
    ///
    /// The entity must have matched [`matches`](Self::matches) under the
    /// same world, and the caller must hold dispatch-level exclusivity for
    /// every mutably fetched component type.
    unsafe fn fetch<'a>(world: *mut World, entity: Entity) -> Self::Item<'a>;
}

impl<C: Component> Fetch for &C {
    type Item<'a> = &'a C;

    fn init(world: &mut World) {
        world.register_component::<C>();
    }

    fn collect(query: &mut QueryAccess, world: &World) {
        query.include_ro.insert(world.types().token::<C>());
    }

    fn matches(world: &World, id: entity::Id) -> bool {
        world
            .types()
            .get::<C>()
            .is_some_and(|token| world.has_token(token, id))
    }

    unsafe fn fetch<'a>(world: *mut World, entity: Entity) -> Self::Item<'a> {
        // SAFETY: Read access covered by the owning descriptor; presence
        // checked during the match scan.
        unsafe {
            (*world)
                .component_by_id::<C>(entity.id())
                .expect("matched entity lost a component mid-iteration")
        }
    }
}

impl<C: Component> Fetch for &mut C {
    type Item<'a> = &'a mut C;

    fn init(world: &mut World) {
        world.register_component::<C>();
    }

    fn collect(query: &mut QueryAccess, world: &World) {
        query.include_mut.insert(world.types().token::<C>());
    }

    fn matches(world: &World, id: entity::Id) -> bool {
        world
            .types()
            .get::<C>()
            .is_some_and(|token| world.has_token(token, id))
    }

    unsafe fn fetch<'a>(world: *mut World, entity: Entity) -> Self::Item<'a> {
        // SAFETY: Write access covered by the owning descriptor; the
        // dispatcher keeps every other reader/writer of C out of flight, and
        // the iterator yields each entity at most once.
        unsafe {
            (*world)
                .component_by_id_mut::<C>(entity.id())
                .expect("matched entity lost a component mid-iteration")
        }
    }
}

/// Fetching [`Entity`] yields the handle itself.
impl Fetch for Entity {
    type Item<'a> = Entity;

    fn init(_world: &mut World) {}

    fn collect(_query: &mut QueryAccess, _world: &World) {}

    fn matches(_world: &World, _id: entity::Id) -> bool {
        true
    }

    unsafe fn fetch<'a>(_world: *mut World, entity: Entity) -> Self::Item<'a> {
        entity
    }
}

macro_rules! fetch_tuple {
    ($($name:ident),*) => {
        impl<$($name: Fetch),*> Fetch for ($($name,)*) {
            type Item<'a> = ($($name::Item<'a>,)*);

            fn init(world: &mut World) {
                $( $name::init(world); )*
            }

            fn collect(query: &mut QueryAccess, world: &World) {
                $( $name::collect(query, world); )*
            }

            fn matches(world: &World, id: entity::Id) -> bool {
                $( $name::matches(world, id) && )* true
            }

            unsafe fn fetch<'a>(world: *mut World, entity: Entity) -> Self::Item<'a> {
                // SAFETY: Forwarded; tuple elements reach disjoint component
                // columns.
                ($( unsafe { <$name as Fetch>::fetch(world, entity) } ,)*)
            }
        }
    };
}

all_tuples!(fetch_tuple);

/// Presence filters: tuples of component types.
pub trait Filter {
    /// Register component tokens at system registration.
    fn init(world: &mut World);

    /// Contribute the filter's component types to the given set.
    fn collect(set: &mut TypeSet, world: &World);

    /// Returns `true` if the entity slot carries every filtered type.
    fn all_present(world: &World, id: entity::Id) -> bool;

    /// Returns `true` if the entity slot carries none of the filtered types.
    fn none_present(world: &World, id: entity::Id) -> bool;
}

impl Filter for () {
    fn init(_world: &mut World) {}

    fn collect(_set: &mut TypeSet, _world: &World) {}

    fn all_present(_world: &World, _id: entity::Id) -> bool {
        true
    }

    fn none_present(_world: &World, _id: entity::Id) -> bool {
        true
    }
}

macro_rules! filter_tuple {
    ($($name:ident),*) => {
        impl<$($name: Component),*> Filter for ($($name,)*) {
            fn init(world: &mut World) {
                $( world.register_component::<$name>(); )*
            }

            fn collect(set: &mut TypeSet, world: &World) {
                $( set.insert(world.types().token::<$name>()); )*
            }

            fn all_present(world: &World, id: entity::Id) -> bool {
                $(
                    world
                        .types()
                        .get::<$name>()
                        .is_some_and(|token| world.has_token(token, id)) &&
                )* true
            }

            fn none_present(world: &World, id: entity::Id) -> bool {
                $(
                    !world
                        .types()
                        .get::<$name>()
                        .is_some_and(|token| world.has_token(token, id)) &&
                )* true
            }
        }
    };
}

all_tuples!(filter_tuple);

/// Iterator over entities matching a fetch and its filters.
///
/// Matching entities are snapshotted when the parameter is extracted; the
/// iterator then yields one fetched item per entity. Structural changes made
/// through [`Commands`](super::Commands) never affect a live query - they
/// only apply at end of stage.
pub struct Query<'w, G: Fetch, W: Filter = (), X: Filter = ()> {
    world: *mut World,
    entities: std::vec::IntoIter<Entity>,
    _marker: PhantomData<(&'w World, fn() -> (G, W, X))>,
}

impl<'w, G: Fetch, W: Filter, X: Filter> Query<'w, G, W, X> {
    /// Snapshot the matching entities of the world.
    ///
    /// # Safety
    ///
    /// The caller must hold dispatch-level access for every component type
    /// the fetch declares, for the whole lifetime `'w`.
    pub(crate) unsafe fn new(world: *mut World) -> Self {
        // SAFETY: The match scan only reads presence bits; covered by the
        // query's include sets.
        let snapshot = unsafe { &*world };
        let entities: Vec<Entity> = snapshot
            .iter_entities()
            .filter(|entity| {
                G::matches(snapshot, entity.id())
                    && W::all_present(snapshot, entity.id())
                    && X::none_present(snapshot, entity.id())
            })
            .collect();
        Self {
            world,
            entities: entities.into_iter(),
            _marker: PhantomData,
        }
    }

    /// The number of entities not yet yielded.
    pub fn remaining(&self) -> usize {
        self.entities.len()
    }
}

impl<'w, G: Fetch, W: Filter, X: Filter> Iterator for Query<'w, G, W, X> {
    type Item = G::Item<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.entities.next()?;
        // SAFETY: Access held per Query::new; each entity is yielded once,
        // so mutable items never alias.
        Some(unsafe { G::fetch(self.world, entity) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}

impl<G: Fetch, W: Filter, X: Filter> Parameter for Query<'_, G, W, X> {
    type Value<'w> = Query<'w, G, W, X>;

    fn init(world: &mut World) {
        G::init(world);
        W::init(world);
        X::init(world);
    }

    fn access(world: &World) -> world::Access {
        let mut triple = QueryAccess::new();
        G::collect(&mut triple, world);
        W::collect(&mut triple.include_ro, world);
        X::collect(&mut triple.exclude, world);

        let mut access = world::Access::new();
        access.push_query(triple);
        access
    }

    unsafe fn extract<'w>(
        shard: &'w mut world::Shard<'_>,
        _buffer: &'w CommandBuffer,
    ) -> Self::Value<'w> {
        // SAFETY: The shard's owning system declared this query's access.
        unsafe { Query::new(shard.world_ptr()) }
    }
}
