//! A small particle sandbox exercising stages, sets, states, and events.

use log::{Level, LevelFilter, Metadata, Record, info};

use cadence_engine::{
    App, AppExit, LoopPlugin, Stage,
    ecs::system::param::{Commands, EventReader, EventWriter, Query, Res, ResMut},
};
use cadence_macros::{Component, Event, Resource};

#[derive(Component)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Resource, Default)]
struct Tick(u64);

#[derive(Event, Debug)]
struct Landed {
    x: f32,
}

#[derive(Clone, PartialEq, Debug)]
enum SimPhase {
    Integrate,
    Collide,
}

fn setup(commands: Commands) {
    for i in 0..32 {
        let lane = i as f32;
        commands.spawn((
            Position { x: lane, y: 100.0 },
            Velocity {
                dx: 0.0,
                dy: -1.0 - lane * 0.1,
            },
        ));
    }
}

fn integrate(query: Query<(&mut Position, &Velocity)>) {
    for (pos, vel) in query {
        pos.x += vel.dx;
        pos.y += vel.dy;
    }
}

fn apply_gravity(query: Query<&mut Velocity>) {
    for vel in query {
        vel.dy -= 0.05;
    }
}

fn collide(query: Query<&Position>, mut landed: EventWriter<Landed>) {
    for pos in query {
        if pos.y <= 0.0 {
            landed.send(Landed { x: pos.x });
        }
    }
}

fn report(events: EventReader<Landed>, tick: Res<Tick>) {
    for landed in events.iter() {
        info!(
            "particle landed at x={:.1} (tick {})",
            landed.x,
            tick.get().map(|t| t.0).unwrap_or(0)
        );
    }
}

fn advance_tick(mut tick: ResMut<Tick>, mut exit: EventWriter<AppExit>) {
    if let Some(tick) = tick.get_mut() {
        tick.0 += 1;
        if tick.0 >= 240 {
            exit.send(AppExit);
        }
    }
}

/// Minimal stderr logger so engine diagnostics show up with `RUST_LOG`-less
/// setup.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn main() {
    log::set_boxed_logger(Box::new(StderrLogger)).expect("failed to set logger");
    log::set_max_level(LevelFilter::Info);

    let mut app = App::new();
    app.add_plugin(LoopPlugin);
    app.init_resource::<Tick>();
    app.add_event::<Landed>();

    app.configure_sets([SimPhase::Integrate, SimPhase::Collide])
        .expect("set order is acyclic");

    app.add_system(Stage::Startup, setup).expect("register");
    app.system(Stage::Update, apply_gravity)
        .in_set(SimPhase::Integrate)
        .register()
        .expect("register");
    app.system(Stage::Update, integrate)
        .in_set(SimPhase::Integrate)
        .register()
        .expect("register");
    app.system(Stage::Update, collide)
        .in_set(SimPhase::Collide)
        .register()
        .expect("register");
    app.add_system(Stage::PostUpdate, report).expect("register");
    app.add_system(Stage::First, advance_tick).expect("register");

    app.run();

    info!("simulation finished");
}
