//! The application driver: registration, lifecycle, and the main loop.
//!
//! An [`App`] owns the world, the system node arena, one stage runner per
//! populated stage, and the worker pool. Its lifecycle:
//!
//! 1. **Registration** - plugins, resources, events, states, set orders, and
//!    systems are added; ordering edges materialise immediately and cycles
//!    are rejected on the spot.
//! 2. **Startup** - `PreStartup`, `Startup`, `PostStartup`, one pass each.
//! 3. **Main loop** - only with a [`LoopPlugin`]: each tick runs
//!    `First → PreUpdate → StateTransition → Update → PostUpdate →
//!    PreRender → Render → PostRender`. The transition pass runs inside
//!    `StateTransition` and fires `OnExit`/`OnEnter` stages for completed
//!    transitions; event queues advance once per tick; a non-empty
//!    [`AppExit`] queue after the tick ends the loop.
//! 4. **Shutdown** - `PreExit`, `Exit`, `PostExit`, one pass each.
//!
//! ```rust,ignore
//! let mut app = App::new();
//! app.add_plugin(LoopPlugin);
//! app.insert_state(GameState::Menu);
//! app.configure_sets([Phase::Input, Phase::Simulate])?;
//! app.system(Stage::Update, integrate)
//!     .in_set(Phase::Simulate)
//!     .run_if(in_state(GameState::Playing))
//!     .register()?;
//! app.run();
//! ```

pub mod plugin;
pub mod stage;

use std::{
    any::TypeId as StdTypeId,
    collections::{HashMap, HashSet},
};

use log::{debug, trace, warn};

use crate::{
    core::tasks::Executor,
    ecs::{
        event::Event,
        resource::Resource,
        schedule::{
            Condition, Runner, ScheduleError, SystemId, SystemSet,
            node::{self, Node},
            set::{self, SetEq, SetRegistry, SetValue},
        },
        state::States,
        system::{IntoSystem, System, param::EventWriter},
        world::World,
    },
};

pub use plugin::{LoopPlugin, Plugin};
pub use stage::{IntoStageId, OnEnter, OnExit, Stage, StageId};

use stage::{EXIT_STAGES, LOOP_STAGES, STARTUP_STAGES};

/// Default worker pool size.
const DEFAULT_WORKERS: usize = 4;

/// Builtin event ending the main loop.
///
/// Any entry in the queue after a tick makes the driver finish the current
/// tick and proceed to the exit sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppExit;

impl Event for AppExit {}

/// System that requests loop termination.
///
/// ```rust,ignore
/// app.system(Stage::Update, exit_app)
///     .run_if(in_state(GameState::Quitting))
///     .register()?;
/// ```
pub fn exit_app(mut exit: EventWriter<AppExit>) {
    exit.send(AppExit);
}

/// The application driver.
pub struct App {
    world: World,
    nodes: Vec<Node>,
    sets: SetRegistry,
    runners: HashMap<StageId, Runner>,
    plugins: HashSet<StdTypeId>,
    loop_enabled: bool,
    pool: Executor,
}

impl App {
    /// Create an app with the default worker pool.
    pub fn new() -> Self {
        Self::with_worker_threads(DEFAULT_WORKERS)
    }

    /// Create an app with the given number of worker threads.
    pub fn with_worker_threads(workers: usize) -> Self {
        Self {
            world: World::new(),
            nodes: Vec::new(),
            sets: SetRegistry::default(),
            runners: HashMap::new(),
            plugins: HashSet::new(),
            loop_enabled: false,
            pool: Executor::new(workers),
        }
    }

    /// The world.
    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The mutable world.
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Enable the main loop; called by [`LoopPlugin`].
    pub(crate) fn enable_loop(&mut self) {
        self.loop_enabled = true;
    }

    // ==================== Registration ====================

    /// Register a plugin. A second registration of the same plugin type is
    /// ignored.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        if !self.plugins.insert(StdTypeId::of::<P>()) {
            warn!(
                "plugin {} already registered, ignoring",
                std::any::type_name::<P>()
            );
            return self;
        }
        plugin.build(self);
        self
    }

    /// Insert a resource, replacing any existing instance.
    pub fn insert_resource<R: Resource>(&mut self, value: R) -> &mut Self {
        self.world.insert_resource(value);
        self
    }

    /// Insert the default instance of `R` if none exists.
    pub fn init_resource<R: Resource + Default>(&mut self) -> &mut Self {
        self.world.init_resource::<R>();
        self
    }

    /// Register an event type up front.
    ///
    /// Optional: declaring an `EventReader`/`EventWriter` parameter registers
    /// the queue as well.
    pub fn add_event<E: Event>(&mut self) -> &mut Self {
        self.world.register_event::<E>();
        self
    }

    /// Insert state `S` with the given initial value. Does nothing if the
    /// state already exists.
    pub fn insert_state<S: States>(&mut self, value: S) -> &mut Self {
        self.world.insert_state(value);
        self
    }

    /// Insert state `S` with its default value.
    pub fn init_state<S: States + Default>(&mut self) -> &mut Self {
        self.world.init_state::<S>();
        self
    }

    /// Declare the execution order of a set type's values.
    ///
    /// Every same-stage pair of member systems whose set values are ordered
    /// gains an implicit `before` edge, including members registered before
    /// this call. Fails with [`ScheduleError::CycleDetected`] if the new
    /// edges close a cycle; the edges are rolled back.
    pub fn configure_sets<S: SystemSet>(
        &mut self,
        order: impl IntoIterator<Item = S>,
    ) -> Result<&mut Self, ScheduleError> {
        let added = self
            .sets
            .configure(order.into_iter().collect(), &mut self.nodes);

        for (_, to) in &added {
            if node::cycle_through(&self.nodes, *to) {
                let system = self.nodes[to.index()].name().to_string();
                for (from, to) in &added {
                    self.nodes[to.index()].remove_before(*from);
                }
                return Err(ScheduleError::CycleDetected { system });
            }
        }
        Ok(self)
    }

    /// Begin registering a system in the given stage.
    ///
    /// The returned builder carries ordering edges, run conditions, set
    /// memberships, and the main-thread flag; call
    /// [`register`](SystemBuilder::register) to finish.
    pub fn system<M>(
        &mut self,
        stage: impl IntoStageId,
        system: impl IntoSystem<M>,
    ) -> SystemBuilder<'_> {
        let system = IntoSystem::into_system(system, &mut self.world);
        SystemBuilder {
            app: self,
            stage: stage.into_stage_id(),
            system,
            before: Vec::new(),
            after: Vec::new(),
            conditions: Vec::new(),
            memberships: Vec::new(),
            main_thread: false,
        }
    }

    /// Register a system with no extra configuration.
    pub fn add_system<M>(
        &mut self,
        stage: impl IntoStageId,
        system: impl IntoSystem<M>,
    ) -> Result<SystemId, ScheduleError> {
        self.system(stage, system).register()
    }

    // ==================== Lifecycle ====================

    /// Run the full lifecycle: startup, the main loop if enabled, shutdown.
    pub fn run(&mut self) {
        debug!("startup sequence");
        let healthy = self.startup().is_ok();

        if healthy && self.loop_enabled {
            debug!("entering main loop");
            loop {
                match self.update() {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("exit requested");
                        break;
                    }
                    Err(error) => {
                        warn!("main loop aborted: {error}");
                        break;
                    }
                }
            }
        }

        debug!("shutdown sequence");
        self.shutdown();
    }

    /// Run the startup stages once.
    pub fn startup(&mut self) -> Result<(), ScheduleError> {
        for stage in STARTUP_STAGES {
            self.run_stage(&stage.into())?;
        }
        Ok(())
    }

    /// Run one tick of the main loop stages.
    ///
    /// Returns `Ok(false)` once an [`AppExit`] has been observed after the
    /// tick.
    pub fn update(&mut self) -> Result<bool, ScheduleError> {
        for stage in LOOP_STAGES {
            self.run_stage(&stage.into())?;
            if stage == Stage::StateTransition {
                self.apply_state_transitions()?;
            }
        }

        self.world.events_mut().tick_all();
        Ok(!self.exit_requested())
    }

    /// Run the exit stages once. Pool failures are logged, not propagated -
    /// there is nothing left to abort to.
    pub fn shutdown(&mut self) {
        for stage in EXIT_STAGES {
            if let Err(error) = self.run_stage(&stage.into()) {
                warn!("stage aborted during shutdown: {error}");
            }
        }
    }

    /// Run the transition pass and the `OnExit`/`OnEnter` stages of every
    /// completed transition.
    fn apply_state_transitions(&mut self) -> Result<(), ScheduleError> {
        for transition in self.world.apply_state_transitions() {
            trace!("state transition: {transition:?}");
            self.run_stage(&StageId::on_exit_hash(transition.state, transition.exited))?;
            self.run_stage(&StageId::on_enter_hash(transition.state, transition.entered))?;
        }
        Ok(())
    }

    /// Run a single stage to completion, if it has any systems.
    fn run_stage(&mut self, id: &StageId) -> Result<(), ScheduleError> {
        let Some(runner) = self.runners.get_mut(id) else {
            return Ok(());
        };
        trace!("running stage {id:?}");
        runner.prepare(&self.nodes);
        runner.run(&self.nodes, &mut self.world, &self.pool)
    }

    fn exit_requested(&self) -> bool {
        self.world
            .events()
            .queue::<AppExit>()
            .is_some_and(|queue| !queue.is_empty())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// In-progress system registration.
///
/// Created by [`App::system`]; finished by [`register`](Self::register).
pub struct SystemBuilder<'app> {
    app: &'app mut App,
    stage: StageId,
    system: System,
    before: Vec<SystemId>,
    after: Vec<SystemId>,
    conditions: Vec<Condition>,
    memberships: Vec<(StdTypeId, SetValue, SetEq)>,
    main_thread: bool,
}

impl SystemBuilder<'_> {
    /// Require this system to complete before `target`.
    ///
    /// Ignored if `target` lives in a different stage.
    pub fn before(mut self, target: SystemId) -> Self {
        self.before.push(target);
        self
    }

    /// Require `target` to complete before this system.
    ///
    /// Ignored if `target` lives in a different stage.
    pub fn after(mut self, target: SystemId) -> Self {
        self.after.push(target);
        self
    }

    /// Gate the system behind a condition, evaluated at dispatch time each
    /// tick. A system whose condition fails is skipped but still satisfies
    /// its successors.
    pub fn run_if(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add the system to a set value for set-based ordering.
    pub fn in_set<S: SystemSet>(mut self, value: S) -> Self {
        self.memberships.push((
            StdTypeId::of::<S>(),
            Box::new(value),
            set::set_value_eq::<S>,
        ));
        self
    }

    /// Pin the system to the driver thread. It will never overlap any other
    /// system.
    pub fn main_thread(mut self) -> Self {
        self.main_thread = true;
        self
    }

    /// Finish the registration.
    ///
    /// Fails with [`ScheduleError::CycleDetected`] if the declared edges
    /// close a cycle in the same-stage ordering graph; the registration is
    /// rolled back completely.
    pub fn register(self) -> Result<SystemId, ScheduleError> {
        let Self {
            app,
            stage,
            system,
            before,
            after,
            conditions,
            memberships,
            main_thread,
        } = self;

        let id = SystemId::new(app.nodes.len());
        let mut new_node = Node::new(stage.clone(), system, conditions, main_thread);

        // Explicit `after` edges, restricted to the same stage.
        for target in after {
            match app.nodes.get(target.index()) {
                Some(node) if node.stage() == &stage => {
                    new_node.add_before(target);
                }
                _ => trace!("after() reference outside stage ignored"),
            }
        }

        app.nodes.push(new_node);

        // Explicit `before` edges into existing nodes.
        for target in before {
            if target.index() == id.index() {
                continue;
            }
            match app.nodes.get_mut(target.index()) {
                Some(node) if node.stage() == &stage => {
                    node.add_before(id);
                }
                _ => trace!("before() reference outside stage ignored"),
            }
        }

        // Set memberships and their implied edges.
        for (set_type, value, eq) in memberships {
            app.sets.join(set_type, value, eq, id, &mut app.nodes);
        }

        if node::cycle_through(&app.nodes, id) {
            let name = app.nodes[id.index()].name().to_string();
            app.sets.remove_member(id);
            for node in app.nodes.iter_mut() {
                node.remove_before(id);
            }
            app.nodes.pop();
            return Err(ScheduleError::CycleDetected { system: name });
        }

        app.runners
            .entry(stage.clone())
            .or_insert_with(|| Runner::new(stage))
            .add(id);

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicI32, AtomicU32, Ordering},
    };

    use cadence_macros::{Resource, States};

    use super::*;
    use crate::ecs::{
        schedule::in_state,
        system::param::{EventReader, NextState, Res, ResMut, State},
    };

    #[derive(Resource, Default)]
    struct Counter(u32);

    #[derive(States, Clone, PartialEq, Eq, Hash, Debug)]
    enum GameState {
        Paused,
        Running,
    }

    #[derive(Clone, PartialEq, Debug)]
    enum Phase {
        A,
        B,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str);
    impl Event for Named {}

    fn quiet_app() -> App {
        App::with_worker_threads(2)
    }

    #[test]
    fn set_ordering_runs_members_in_order() {
        // Given: set order [A, B], an incrementer in A and an observer in B
        let mut app = quiet_app();
        app.init_resource::<Counter>();
        app.configure_sets([Phase::A, Phase::B]).unwrap();

        app.system(Stage::Update, |mut counter: ResMut<Counter>| {
            if let Some(counter) = counter.get_mut() {
                counter.0 += 1;
            }
        })
        .in_set(Phase::A)
        .register()
        .unwrap();

        let seen = Arc::new(AtomicU32::new(u32::MAX));
        let seen_clone = Arc::clone(&seen);
        app.system(Stage::Update, move |counter: Res<Counter>| {
            seen_clone.store(counter.get().map(|c| c.0).unwrap_or(0), Ordering::SeqCst);
        })
        .in_set(Phase::B)
        .register()
        .unwrap();

        // When: one tick
        app.update().unwrap();

        // Then: the observer saw the increment
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn conflicting_systems_never_overlap_across_many_ticks() {
        #[derive(Resource, Default)]
        struct Shared(u64);

        // Given: an unordered writer/reader pair with an overlap tripwire
        let mut app = quiet_app();
        app.init_resource::<Shared>();

        let active = Arc::new(AtomicI32::new(0));
        let writes = Arc::new(AtomicU32::new(0));
        let reads = Arc::new(AtomicU32::new(0));

        let active_w = Arc::clone(&active);
        let writes_clone = Arc::clone(&writes);
        app.add_system(Stage::Update, move |mut shared: ResMut<Shared>| {
            assert_eq!(active_w.fetch_add(1, Ordering::SeqCst), 0, "overlap");
            if let Some(shared) = shared.get_mut() {
                shared.0 += 1;
            }
            writes_clone.fetch_add(1, Ordering::SeqCst);
            active_w.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();

        let active_r = Arc::clone(&active);
        let reads_clone = Arc::clone(&reads);
        app.add_system(Stage::Update, move |shared: Res<Shared>| {
            assert_eq!(active_r.fetch_add(1, Ordering::SeqCst), 0, "overlap");
            let _ = shared.get();
            reads_clone.fetch_add(1, Ordering::SeqCst);
            active_r.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();

        // When
        for _ in 0..1000 {
            app.update().unwrap();
        }

        // Then: both ran every tick, never concurrently
        assert_eq!(writes.load(Ordering::SeqCst), 1000);
        assert_eq!(reads.load(Ordering::SeqCst), 1000);
        assert_eq!(app.world().resource::<Shared>().unwrap().0, 1000);
    }

    #[test]
    fn cycle_is_rejected_at_registration() {
        // Given
        let mut app = quiet_app();
        let first = app.add_system(Stage::Update, || {}).unwrap();

        // When: the second system wants to be both before and after the
        // first
        let result = app
            .system(Stage::Update, || {})
            .after(first)
            .before(first)
            .register();

        // Then
        assert!(matches!(result, Err(ScheduleError::CycleDetected { .. })));

        // And the registration rolled back: the stage still runs
        let ran = Arc::new(AtomicU32::new(0));
        let ran_clone = Arc::clone(&ran);
        app.add_system(Stage::Update, move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        app.update().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn edges_to_other_stages_are_ignored() {
        // Given: an Update system referencing a PostUpdate system
        let mut app = quiet_app();
        let elsewhere = app.add_system(Stage::PostUpdate, || {}).unwrap();

        // When / Then: no error, the reference is dropped
        app.system(Stage::Update, || {})
            .after(elsewhere)
            .register()
            .unwrap();
        app.update().unwrap();
    }

    #[test]
    fn condition_skip_preserves_order() {
        // Given: s1 increments while Paused, s2 always observes after s1
        let mut app = quiet_app();
        app.init_resource::<Counter>();
        app.insert_state(GameState::Running);

        let s1 = app
            .system(Stage::Update, |mut counter: ResMut<Counter>| {
                if let Some(counter) = counter.get_mut() {
                    counter.0 += 1;
                }
            })
            .run_if(in_state(GameState::Paused))
            .register()
            .unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed_clone = Arc::clone(&observed);
        app.system(Stage::Update, move |counter: Res<Counter>| {
            observed_clone
                .lock()
                .unwrap()
                .push(counter.get().map(|c| c.0).unwrap_or(0));
        })
        .after(s1)
        .register()
        .unwrap();

        // When: one tick Running (s1 skipped), then Paused
        app.update().unwrap();
        app.world_mut().set_next_state(GameState::Paused);
        app.update().unwrap();

        // Then: first tick saw no increment, second saw it
        assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn events_are_retained_for_two_ticks() {
        // Given: a scripted writer and an ordered reader
        let mut app = quiet_app();

        let script = Arc::new(Mutex::new(vec!["a", "b", "c"]));
        let script_clone = Arc::clone(&script);
        let writer = app
            .add_system(Stage::Update, move |mut events: EventWriter<Named>| {
                let mut script = script_clone.lock().unwrap();
                if !script.is_empty() {
                    events.send(Named(script.remove(0)));
                }
            })
            .unwrap();

        let windows = Arc::new(Mutex::new(Vec::new()));
        let windows_clone = Arc::clone(&windows);
        app.system(Stage::Update, move |events: EventReader<Named>| {
            let seen: Vec<&'static str> = events.iter().map(|e| e.0).collect();
            windows_clone.lock().unwrap().push(seen);
        })
        .after(writer)
        .register()
        .unwrap();

        // When: three ticks
        app.update().unwrap();
        app.update().unwrap();
        app.update().unwrap();

        // Then: each tick sees this tick's and last tick's events
        assert_eq!(
            *windows.lock().unwrap(),
            vec![vec!["a"], vec!["a", "b"], vec!["b", "c"]]
        );
    }

    #[test]
    fn app_exit_finishes_the_tick_then_shuts_down_once() {
        // Given: a loop app that exits on the third tick
        let mut app = quiet_app();
        app.add_plugin(LoopPlugin);

        let ticks = Arc::new(AtomicU32::new(0));
        let late_stage_ticks = Arc::new(AtomicU32::new(0));
        let exits = Arc::new(AtomicU32::new(0));

        let ticks_clone = Arc::clone(&ticks);
        app.add_system(Stage::Update, move |mut exit: EventWriter<AppExit>| {
            if ticks_clone.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                exit.send(AppExit);
            }
        })
        .unwrap();

        // PostRender still runs in the tick that requested the exit
        let late_clone = Arc::clone(&late_stage_ticks);
        app.add_system(Stage::PostRender, move || {
            late_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let exits_clone = Arc::clone(&exits);
        app.add_system(Stage::Exit, move || {
            exits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        // When
        app.run();

        // Then
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(late_stage_ticks.load(Ordering::SeqCst), 3);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_transition_fires_exit_then_enter_before_update() {
        // Given: a transition proposed in PreUpdate of the second tick
        let mut app = quiet_app();
        app.insert_state(GameState::Paused);

        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let log_propose = Arc::clone(&log);
        app.add_system(Stage::PreUpdate, {
            let mut proposed = false;
            move |mut next: NextState<GameState>| {
                if !proposed {
                    next.set(GameState::Running);
                    proposed = true;
                    log_propose.lock().unwrap().push("propose");
                }
            }
        })
        .unwrap();

        let log_exit = Arc::clone(&log);
        app.add_system(OnExit(GameState::Paused), move || {
            log_exit.lock().unwrap().push("exit_paused");
        })
        .unwrap();

        let log_enter = Arc::clone(&log);
        app.add_system(OnEnter(GameState::Running), move || {
            log_enter.lock().unwrap().push("enter_running");
        })
        .unwrap();

        let log_update = Arc::clone(&log);
        app.add_system(Stage::Update, move |state: State<GameState>| {
            if state.is(&GameState::Running) {
                log_update.lock().unwrap().push("update_running");
            }
        })
        .unwrap();

        // When
        app.update().unwrap();

        // Then: exit before enter, both before Update of the same tick
        assert_eq!(
            *log.lock().unwrap(),
            vec!["propose", "exit_paused", "enter_running", "update_running"]
        );
    }

    #[test]
    fn just_created_is_true_for_exactly_one_tick() {
        // Given: a First-stage observer, running before the transition pass
        let mut app = quiet_app();
        app.insert_state(GameState::Paused);

        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed_clone = Arc::clone(&observed);
        app.add_system(Stage::First, move |state: State<GameState>| {
            observed_clone.lock().unwrap().push(state.just_created());
        })
        .unwrap();

        // When
        app.update().unwrap();
        app.update().unwrap();

        // Then
        assert_eq!(*observed.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn duplicate_plugins_are_ignored() {
        struct CountingPlugin(Arc<AtomicU32>);

        impl Plugin for CountingPlugin {
            fn build(&self, _app: &mut App) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let builds = Arc::new(AtomicU32::new(0));
        let mut app = quiet_app();

        app.add_plugin(CountingPlugin(Arc::clone(&builds)));
        app.add_plugin(CountingPlugin(Arc::clone(&builds)));

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_without_loop_plugin_does_startup_and_shutdown_only() {
        // Given
        let mut app = quiet_app();
        let startups = Arc::new(AtomicU32::new(0));
        let updates = Arc::new(AtomicU32::new(0));
        let exits = Arc::new(AtomicU32::new(0));

        let startups_clone = Arc::clone(&startups);
        app.add_system(Stage::Startup, move || {
            startups_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let updates_clone = Arc::clone(&updates);
        app.add_system(Stage::Update, move || {
            updates_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let exits_clone = Arc::clone(&exits);
        app.add_system(Stage::PostExit, move || {
            exits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        // When
        app.run();

        // Then
        assert_eq!(startups.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn startup_stages_run_in_order() {
        let mut app = quiet_app();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (stage, label) in [
            (Stage::PostStartup, "post"),
            (Stage::PreStartup, "pre"),
            (Stage::Startup, "main"),
        ] {
            let log = Arc::clone(&log);
            app.add_system(stage, move || {
                log.lock().unwrap().push(label);
            })
            .unwrap();
        }

        app.startup().unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["pre", "main", "post"]);
    }

    #[test]
    fn exit_app_helper_requests_exit() {
        let mut app = quiet_app();
        app.add_plugin(LoopPlugin);

        let ticks = Arc::new(AtomicU32::new(0));
        let ticks_clone = Arc::clone(&ticks);
        app.add_system(Stage::Update, move || {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        app.add_system(Stage::Update, exit_app).unwrap();

        app.run();

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
