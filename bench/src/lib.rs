//! Shared workload builders for the scheduler benchmarks.

use cadence_engine::{App, Stage};
use cadence_engine::ecs::system::param::{Query, Res, ResMut};
use cadence_macros::{Component, Resource};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[derive(Component)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Component)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Resource, Default)]
pub struct Accumulator(pub f64);

fn integrate(query: Query<(&mut Position, &Velocity)>) {
    for (pos, vel) in query {
        pos.x += vel.dx;
        pos.y += vel.dy;
    }
}

fn accumulate(query: Query<&Position>, mut total: ResMut<Accumulator>) {
    let sum: f64 = query.map(|pos| (pos.x + pos.y) as f64).sum();
    if let Some(total) = total.get_mut() {
        total.0 += sum;
    }
}

fn observe(total: Res<Accumulator>) {
    let _ = total.get();
}

/// An app with `entities` particles and a small mixed Update workload:
/// one component writer, one resource writer, and several readers that can
/// run in parallel.
pub fn particle_app(entities: usize, readers: usize) -> App {
    let mut app = App::new();
    app.init_resource::<Accumulator>();

    // Seeded so repeated runs measure the same workload.
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..entities {
        app.world_mut().spawn((
            Position {
                x: rng.gen_range(-100.0..100.0),
                y: rng.gen_range(-100.0..100.0),
            },
            Velocity {
                dx: rng.gen_range(-1.0..1.0),
                dy: rng.gen_range(-1.0..1.0),
            },
        ));
    }

    app.add_system(Stage::Update, integrate).unwrap();
    app.add_system(Stage::Update, accumulate).unwrap();
    for _ in 0..readers {
        app.add_system(Stage::Update, observe).unwrap();
    }

    app
}
