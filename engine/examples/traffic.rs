//! State-driven traffic light: demonstrates states, run conditions,
//! `OnEnter` stages, and loop termination.

use cadence_engine::{
    App, AppExit, LoopPlugin, OnEnter, Stage, in_state,
    ecs::system::param::{EventWriter, NextState, Res, ResMut},
};
use cadence_macros::{Resource, States};

#[derive(States, Clone, PartialEq, Eq, Hash, Debug, Default)]
enum Light {
    #[default]
    Red,
    Green,
    Yellow,
}

#[derive(Resource, Default)]
struct Timer(u32);

#[derive(Resource, Default)]
struct Cycles(u32);

fn tick_timer(mut timer: ResMut<Timer>) {
    if let Some(timer) = timer.get_mut() {
        timer.0 += 1;
    }
}

fn reset_timer(mut timer: ResMut<Timer>) {
    if let Some(timer) = timer.get_mut() {
        timer.0 = 0;
    }
}

fn advance(timer: Res<Timer>, mut next: NextState<Light>) {
    if timer.get().map(|t| t.0).unwrap_or(0) >= 3 {
        next.set(Light::Green);
    }
}

fn to_yellow(timer: Res<Timer>, mut next: NextState<Light>) {
    if timer.get().map(|t| t.0).unwrap_or(0) >= 4 {
        next.set(Light::Yellow);
    }
}

fn back_to_red(timer: Res<Timer>, mut next: NextState<Light>) {
    if timer.get().map(|t| t.0).unwrap_or(0) >= 2 {
        next.set(Light::Red);
    }
}

fn count_cycle(mut cycles: ResMut<Cycles>, mut exit: EventWriter<AppExit>) {
    if let Some(cycles) = cycles.get_mut() {
        cycles.0 += 1;
        println!("completed cycle {}", cycles.0);
        if cycles.0 >= 3 {
            exit.send(AppExit);
        }
    }
}

fn announce(light: &'static str) -> impl FnMut() + Send + Sync {
    move || println!("light is now {light}")
}

fn main() {
    let mut app = App::new();
    app.add_plugin(LoopPlugin);
    app.init_state::<Light>();
    app.init_resource::<Timer>();
    app.init_resource::<Cycles>();

    app.add_system(Stage::PreUpdate, tick_timer).unwrap();

    app.system(Stage::Update, advance)
        .run_if(in_state(Light::Red))
        .register()
        .unwrap();
    app.system(Stage::Update, to_yellow)
        .run_if(in_state(Light::Green))
        .register()
        .unwrap();
    app.system(Stage::Update, back_to_red)
        .run_if(in_state(Light::Yellow))
        .register()
        .unwrap();

    app.add_system(OnEnter(Light::Green), announce("green"))
        .unwrap();
    app.add_system(OnEnter(Light::Yellow), announce("yellow"))
        .unwrap();
    app.add_system(OnEnter(Light::Red), announce("red")).unwrap();
    app.add_system(OnEnter(Light::Red), reset_timer).unwrap();
    app.add_system(OnEnter(Light::Green), reset_timer).unwrap();
    app.add_system(OnEnter(Light::Yellow), reset_timer).unwrap();
    app.add_system(OnEnter(Light::Red), count_cycle).unwrap();

    app.run();
}
