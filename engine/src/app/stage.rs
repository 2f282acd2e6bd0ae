//! Lifecycle stages and stage identities.
//!
//! Stages are the named points in the application lifecycle that own a stage
//! runner each. The built-in stages form a closed enum; `OnEnter`/`OnExit`
//! stages are addressed by state type identity plus a hash of the state
//! value, so every distinct state value gets its own stage without boxing
//! values into the id.

use std::any::TypeId as StdTypeId;

use crate::ecs::state::{States, state_hash};

/// The built-in lifecycle stages, in no particular order.
///
/// Startup stages run once before the loop, the loop stages run every tick
/// (only when a `LoopPlugin` is present), and the exit stages run once after
/// the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreStartup,
    Startup,
    PostStartup,
    First,
    PreUpdate,
    StateTransition,
    Update,
    PostUpdate,
    PreRender,
    Render,
    PostRender,
    PreExit,
    Exit,
    PostExit,
}

/// The startup sequence, in execution order.
pub(crate) const STARTUP_STAGES: [Stage; 3] = [Stage::PreStartup, Stage::Startup, Stage::PostStartup];

/// One tick of the main loop, in execution order.
pub(crate) const LOOP_STAGES: [Stage; 8] = [
    Stage::First,
    Stage::PreUpdate,
    Stage::StateTransition,
    Stage::Update,
    Stage::PostUpdate,
    Stage::PreRender,
    Stage::Render,
    Stage::PostRender,
];

/// The shutdown sequence, in execution order.
pub(crate) const EXIT_STAGES: [Stage; 3] = [Stage::PreExit, Stage::Exit, Stage::PostExit];

/// Identity of a stage runner: a built-in stage or a state transition stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageId {
    /// One of the built-in lifecycle stages.
    Core(Stage),

    /// Runs when a state transitions *to* the identified value.
    Enter(StateMark),

    /// Runs when a state transitions *away from* the identified value.
    Leave(StateMark),
}

impl StageId {
    /// The stage id for entering state value `value`.
    pub(crate) fn on_enter_hash(state: StdTypeId, value: u64) -> Self {
        StageId::Enter(StateMark { state, value })
    }

    /// The stage id for leaving state value `value`.
    pub(crate) fn on_exit_hash(state: StdTypeId, value: u64) -> Self {
        StageId::Leave(StateMark { state, value })
    }
}

impl From<Stage> for StageId {
    fn from(stage: Stage) -> Self {
        StageId::Core(stage)
    }
}

/// A state value identity: the state's type plus a hash of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateMark {
    state: StdTypeId,
    value: u64,
}

impl StateMark {
    /// Identify a state value.
    pub(crate) fn of<S: States>(value: &S) -> Self {
        Self {
            state: StdTypeId::of::<S>(),
            value: state_hash(value),
        }
    }
}

/// Tag for systems that should run when a state enters the given value.
///
/// ```rust,ignore
/// app.add_system(OnEnter(GameState::Playing), setup_level)?;
/// ```
pub struct OnEnter<S: States>(pub S);

/// Tag for systems that should run when a state leaves the given value.
pub struct OnExit<S: States>(pub S);

/// Conversion into a [`StageId`], accepted anywhere a stage is expected.
pub trait IntoStageId {
    fn into_stage_id(self) -> StageId;
}

impl IntoStageId for Stage {
    fn into_stage_id(self) -> StageId {
        StageId::Core(self)
    }
}

impl IntoStageId for StageId {
    fn into_stage_id(self) -> StageId {
        self
    }
}

impl<S: States> IntoStageId for OnEnter<S> {
    fn into_stage_id(self) -> StageId {
        StageId::Enter(StateMark::of(&self.0))
    }
}

impl<S: States> IntoStageId for OnExit<S> {
    fn into_stage_id(self) -> StageId {
        StageId::Leave(StateMark::of(&self.0))
    }
}
