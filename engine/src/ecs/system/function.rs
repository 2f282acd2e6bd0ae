//! Conversion of plain functions into systems via parameter extraction.
//!
//! [`WithParams`] bridges clean function signatures (elided lifetimes) and
//! runtime execution (shard lifetime). The implementations use a
//! higher-ranked trait bound:
//!
//! ```rust,ignore
//! for<'w> &'w mut Func: FnMut(A, B) + FnMut(A::Value<'w>, B::Value<'w>)
//! ```
//!
//! which requires the function to accept both its declared parameter types
//! (as written in the signature) and the extracted values carrying the
//! shard's lifetime. When a system runs, each parameter is pulled out of the
//! shard with [`Parameter::extract`] and the function is invoked with the
//! extracted values.
//!
//! # Safety
//!
//! Extraction hands each parameter an aliased `&mut Shard`. This is sound
//! because parameters of one system touch disjoint data (a system that
//! conflicts with itself would already conflict with everything) and because
//! the stage runner never lets two conflicting systems be in flight at once.

use crate::{
    all_tuples,
    ecs::{
        system::{CommandBuffer, IntoSystem, System, param::Parameter},
        world,
    },
};

/// Functions callable with extracted system parameters.
///
/// Implemented for functions of zero to sixteen [`Parameter`] arguments.
/// Not implemented by hand; the blanket impls below cover every eligible
/// function.
pub trait WithParams<Params>: 'static {
    /// Prepare the world for every parameter (tokens, columns, queues).
    fn init(world: &mut world::World);

    /// The merged access descriptor over all parameters.
    fn access(world: &world::World) -> world::Access;

    /// Extract every parameter from the shard and invoke the function.
    ///
    /// # Safety
    ///
    /// Caller must guarantee no conflicting system is concurrently in
    /// flight; see the module docs.
    unsafe fn run(&mut self, shard: &mut world::Shard<'_>, buffer: &CommandBuffer);
}

/// Zero-parameter functions: no world access at all.
impl<Func> WithParams<()> for Func
where
    Func: FnMut() + 'static,
{
    fn init(_world: &mut world::World) {}

    fn access(_world: &world::World) -> world::Access {
        world::Access::new()
    }

    unsafe fn run(&mut self, _shard: &mut world::Shard<'_>, _buffer: &CommandBuffer) {
        self();
    }
}

macro_rules! with_params_function {
    ($($param:ident),*) => {
        impl<Func, $($param: Parameter),*> WithParams<($($param,)*)> for Func
        where
            Func: 'static,
            // The function must accept the declared parameter types and the
            // extracted values for any shard lifetime.
            for<'w> &'w mut Func: FnMut($($param),*) + FnMut($($param::Value<'w>),*),
        {
            fn init(world: &mut world::World) {
                $( $param::init(world); )*
            }

            fn access(world: &world::World) -> world::Access {
                let mut access = world::Access::new();
                $( access = access.merge(&$param::access(world)); )*
                access
            }

            unsafe fn run(&mut self, shard: &mut world::Shard<'_>, buffer: &CommandBuffer) {
                // Helper so the call goes through the HRTB FnMut impl rather
                // than the macro-hygiene-confused direct call.
                #[allow(clippy::too_many_arguments, non_snake_case)]
                fn call_it<$($param),*>(mut func: impl FnMut($($param),*), $($param: $param),*) {
                    func($($param),*);
                }

                $(
                    // SAFETY: Aliased shard pointers are sound here - each
                    // parameter reaches disjoint data, validated through the
                    // merged access descriptor at dispatch time.
                    #[allow(non_snake_case)]
                    let $param = unsafe {
                        $param::extract(&mut *(shard as *mut world::Shard<'_>), buffer)
                    };
                )*

                call_it(self, $($param),*);
            }
        }
    };
}

all_tuples!(with_params_function);

/// Every `WithParams` function converts into a parallel-capable system.
impl<Func, Params> IntoSystem<Params> for Func
where
    Func: WithParams<Params> + Send + Sync + 'static,
    Params: 'static,
{
    fn into_system(mut instance: Self, world: &mut world::World) -> System {
        Func::init(world);
        let access = Func::access(world);
        System::new(std::any::type_name::<Func>(), access, move |shard, buffer| {
            // SAFETY: System::run carries the no-conflicting-concurrency
            // contract; we forward it unchanged.
            unsafe { instance.run(shard, buffer) }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use cadence_macros::{Component, Resource};

    use crate::ecs::{
        system::{CommandBuffer, IntoSystem, System, param::Query, param::Res, param::ResMut},
        world,
    };

    #[derive(Component)]
    struct Comp1 {
        value: i32,
    }

    #[derive(Component)]
    struct Comp2 {
        value: i32,
    }

    #[derive(Resource)]
    struct Total(i32);

    fn into_system<M>(world: &mut world::World, sys: impl IntoSystem<M>) -> System {
        IntoSystem::into_system(sys, world)
    }

    fn run(system: &mut System, world: &mut world::World) {
        let buffer = CommandBuffer::new();
        let mut shard = world.shard();
        // SAFETY: Single-threaded test; nothing else is running.
        unsafe { system.run(&mut shard, &buffer) };
    }

    #[test]
    fn no_param_function_system() {
        // Given
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let my_system = move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        };

        let mut world = world::World::new();

        // When
        let mut system = into_system(&mut world, my_system);
        run(&mut system, &mut world);

        // Then
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(system.access().is_empty());
    }

    #[test]
    fn mutable_query_system() {
        fn increment(query: Query<&mut Comp1>) {
            for comp in query {
                comp.value += 1;
            }
        }

        let mut world = world::World::new();
        world.spawn(Comp1 { value: 5 });
        world.spawn(Comp1 { value: 10 });

        let mut system = into_system(&mut world, increment);
        run(&mut system, &mut world);

        let mut values: Vec<i32> = world
            .iter_entities()
            .filter_map(|e| world.get::<Comp1>(e).map(|c| c.value))
            .collect();
        values.sort();
        assert_eq!(values, vec![6, 11]);
    }

    #[test]
    fn mixed_query_and_resource_system() {
        fn sum(query: Query<&Comp1>, mut total: ResMut<Total>) {
            let sum: i32 = query.map(|c| c.value).sum();
            if let Some(total) = total.get_mut() {
                total.0 = sum;
            }
        }

        let mut world = world::World::new();
        world.insert_resource(Total(0));
        world.spawn(Comp1 { value: 2 });
        world.spawn(Comp1 { value: 3 });
        world.spawn(Comp2 { value: 100 });

        let mut system = into_system(&mut world, sum);
        run(&mut system, &mut world);

        assert_eq!(world.resource::<Total>().unwrap().0, 5);
    }

    #[test]
    fn multiple_query_parameters_system() {
        fn count(query1: Query<&Comp1>, query2: Query<&Comp2>) {
            assert_eq!(query1.count(), 2);
            assert_eq!(query2.count(), 1);
        }

        let mut world = world::World::new();
        world.spawn(Comp1 { value: 1 });
        world.spawn((Comp1 { value: 2 }, Comp2 { value: 10 }));

        let mut system = into_system(&mut world, count);
        run(&mut system, &mut world);
    }

    #[test]
    fn access_reflects_parameters() {
        // Given
        fn reader(_total: Res<Total>) {}
        fn writer(_total: ResMut<Total>) {}

        let mut world = world::World::new();

        // When
        let read_system = into_system(&mut world, reader);
        let write_system = into_system(&mut world, writer);

        // Then
        assert!(read_system.access().conflicts_with(write_system.access()));
        assert!(!read_system.access().conflicts_with(read_system.access()));
    }

    #[test]
    fn system_can_run_multiple_times() {
        fn bump(query: Query<&mut Comp1>) {
            for comp in query {
                comp.value += 1;
            }
        }

        let mut world = world::World::new();
        let entity = world.spawn(Comp1 { value: 0 });

        let mut system = into_system(&mut world, bump);
        run(&mut system, &mut world);
        run(&mut system, &mut world);
        run(&mut system, &mut world);

        assert_eq!(world.get::<Comp1>(entity).unwrap().value, 3);
    }

    #[test]
    fn closure_system_captures_environment() {
        let total = Arc::new(AtomicU32::new(0));
        let total_clone = Arc::clone(&total);
        let system = move |query: Query<&Comp1>| {
            total_clone.fetch_add(query.count() as u32, Ordering::SeqCst);
        };

        let mut world = world::World::new();
        world.spawn(Comp1 { value: 1 });
        world.spawn(Comp1 { value: 2 });

        let mut system = into_system(&mut world, system);
        run(&mut system, &mut world);

        assert_eq!(total.load(Ordering::SeqCst), 2);
    }
}
