//! System nodes and the ordering graph.

use std::{cell::UnsafeCell, collections::HashSet};

use crate::{
    app::stage::StageId,
    ecs::{system::System, world},
};

/// Stable identity of a registered system.
///
/// Ids index into the app's node arena and never change after registration;
/// ordering edges and set memberships reference nodes by id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(u32);

impl SystemId {
    /// Construct an id from a raw arena index.
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// The arena index of this id.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Interior-mutable slot for a system callable.
///
/// The dispatcher keeps scanning node metadata (access, edges, conditions)
/// while workers execute systems; holding the callable in a cell keeps those
/// reads on a shared reference while exactly one worker mutates the callable
/// through the raw pointer.
pub(crate) struct SystemCell(UnsafeCell<System>);

// SAFETY: The stage runner hands each cell's pointer to at most one worker at
// a time (a node is either pending, in flight on one worker, or done), and
// System's contents are Send + Sync.
unsafe impl Sync for SystemCell {}

impl SystemCell {
    fn new(system: System) -> Self {
        Self(UnsafeCell::new(system))
    }

    /// The raw pointer to the callable.
    ///
    /// Callers must uphold the single-executor discipline documented on the
    /// type.
    pub(crate) fn get(&self) -> *mut System {
        self.0.get()
    }
}

/// A registered system with everything the scheduler knows about it.
pub struct Node {
    /// Display name, taken from the system function's type name.
    name: &'static str,

    /// The stage this node belongs to.
    stage: StageId,

    /// The node's access descriptor, cloned out of the system at
    /// registration so the dispatcher never touches the cell of a running
    /// system.
    access: world::Access,

    /// The callable.
    system: SystemCell,

    /// Run conditions, all of which must hold at dispatch time.
    conditions: Vec<super::Condition>,

    /// Nodes that must complete before this one, restricted to the same
    /// stage.
    user_before: HashSet<SystemId>,

    /// Whether the callable must execute on the driver thread.
    main_thread: bool,
}

impl Node {
    /// Create a node around a system.
    pub(crate) fn new(
        stage: StageId,
        system: System,
        conditions: Vec<super::Condition>,
        main_thread: bool,
    ) -> Self {
        Self {
            name: system.name(),
            stage,
            access: system.access().clone(),
            system: SystemCell::new(system),
            conditions,
            user_before: HashSet::new(),
            main_thread,
        }
    }

    /// The node's display name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The stage this node belongs to.
    #[inline]
    pub fn stage(&self) -> &StageId {
        &self.stage
    }

    /// The node's access descriptor.
    #[inline]
    pub fn access(&self) -> &world::Access {
        &self.access
    }

    /// Whether this node must run on the driver thread.
    #[inline]
    pub fn main_thread(&self) -> bool {
        self.main_thread
    }

    /// The node's direct predecessors.
    #[inline]
    pub(crate) fn user_before(&self) -> &HashSet<SystemId> {
        &self.user_before
    }

    /// Add a predecessor edge. Returns `true` if the edge was new.
    pub(crate) fn add_before(&mut self, id: SystemId) -> bool {
        self.user_before.insert(id)
    }

    /// Remove a predecessor edge.
    pub(crate) fn remove_before(&mut self, id: SystemId) {
        self.user_before.remove(&id);
    }

    /// The node's run conditions.
    #[inline]
    pub(crate) fn conditions(&self) -> &[super::Condition] {
        &self.conditions
    }

    /// The raw pointer to the node's callable; see [`SystemCell`].
    #[inline]
    pub(crate) fn system_ptr(&self) -> *mut System {
        self.system.get()
    }
}

/// Returns `true` if following `user_before` edges from `start` leads back
/// to `start`.
///
/// The graph was acyclic before the edges of the newest registration were
/// added, so any cycle must pass through that node; one back-traversal from
/// it is a complete check.
pub(crate) fn cycle_through(nodes: &[Node], start: SystemId) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<SystemId> = nodes[start.index()].user_before().iter().copied().collect();

    while let Some(current) = stack.pop() {
        if current == start {
            return true;
        }
        if visited.insert(current) {
            stack.extend(nodes[current.index()].user_before().iter().copied());
        }
    }
    false
}
