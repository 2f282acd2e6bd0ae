//! Per-stage execution with conflict-aware parallelism.
//!
//! A [`Runner`] owns the nodes of one stage and executes one pass to
//! completion each tick. Dispatch is dynamic: the single dispatcher thread
//! scans the pending nodes in a precomputed order and hands every eligible
//! node to the worker pool, where eligibility means
//!
//! 1. every predecessor has completed (or was skipped),
//! 2. every run condition holds right now, and
//! 3. the node's access descriptor is compatible with everything in flight.
//!
//! Conflicts never become static edges - two conflicting nodes may run in
//! either order, they just never overlap in time.
//!
//! # Scan order
//!
//! [`prepare`](Runner::prepare) recomputes two heuristics per node each tick:
//! `depth` (longest predecessor chain) and `reach` (sum of the smoothed
//! runtimes of direct predecessors). The scan order sorts by depth, then
//! stably by reach, so nodes that gate long chains are offered to the pool
//! first. Given identical timings and conditions, dispatch order is
//! reproducible.
//!
//! # Main-thread affinity
//!
//! A node flagged main-thread executes on the dispatcher itself, and only
//! while nothing is in flight, so it can never overlap a worker-held node.
//!
//! # Blocking
//!
//! When no pending node is eligible, the dispatcher parks on the completion
//! channel until an in-flight node finishes. The scan restarts from the head
//! after every state change, so any node whose prerequisites are satisfied
//! is picked up within one drain cycle.

use std::{collections::HashMap, time::Instant};

use crossbeam::channel;
use log::trace;

use crate::{
    app::stage::StageId,
    core::tasks::Executor,
    ecs::{
        schedule::{ScheduleError, SystemId, node::Node},
        system::CommandBuffer,
        world::{Access, Shard, World},
    },
};

/// Weight of the newest sample in the runtime average:
/// `avg = 0.1 * sample + 0.9 * avg`.
const SAMPLE_WEIGHT: f64 = 0.1;

/// A `Send` wrapper for the world pointer handed to workers.
#[derive(Clone, Copy)]
struct WorldPtr(*mut World);

// SAFETY: Workers only reach the world through shards, and the dispatcher's
// compatibility checks keep concurrently live shards on disjoint data.
unsafe impl Send for WorldPtr {}

/// Outcome of one scan over the pending list.
enum Pick {
    /// Dispatch the node at this position in the pending list.
    Run(usize),

    /// The node at this position failed a condition; record it as done.
    Skip(usize),

    /// Nothing eligible; wait for an in-flight completion.
    Wait,
}

/// Executes the nodes of a single stage.
pub struct Runner {
    /// The stage this runner drains.
    stage: StageId,

    /// Member nodes, in registration order.
    members: Vec<SystemId>,

    /// Member index lookup for edge resolution.
    index_of: HashMap<SystemId, usize>,

    /// Smoothed runtime per member, in milliseconds.
    avg_ms: Vec<f64>,

    /// Scan order over member indices, rebuilt by `prepare`.
    order: Vec<usize>,
}

impl Runner {
    /// Create an empty runner for a stage.
    pub(crate) fn new(stage: StageId) -> Self {
        Self {
            stage,
            members: Vec::new(),
            index_of: HashMap::new(),
            avg_ms: Vec::new(),
            order: Vec::new(),
        }
    }

    /// The stage this runner drains.
    pub fn stage(&self) -> &StageId {
        &self.stage
    }

    /// The number of member nodes.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the runner has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Attach a node to this runner.
    pub(crate) fn add(&mut self, id: SystemId) {
        self.index_of.insert(id, self.members.len());
        self.members.push(id);
        self.avg_ms.push(0.0);
    }

    /// Rebuild the scan order from the current edges and timings.
    ///
    /// Called once per tick before [`run`](Self::run).
    pub(crate) fn prepare(&mut self, nodes: &[Node]) {
        let count = self.members.len();

        // depth: 0 for nodes without predecessors, else one past the deepest
        // predecessor. Memoised; registration rejected cycles, so the
        // recursion terminates.
        let mut depth = vec![usize::MAX; count];
        for index in 0..count {
            self.depth_of(index, nodes, &mut depth);
        }

        // reach: summed smoothed runtime of direct predecessors.
        let reach: Vec<f64> = (0..count)
            .map(|index| {
                nodes[self.members[index].index()]
                    .user_before()
                    .iter()
                    .filter_map(|pred| self.index_of.get(pred))
                    .map(|&pred_index| self.avg_ms[pred_index])
                    .sum()
            })
            .collect();

        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by_key(|&index| depth[index]);
        // Stable, so depth breaks ties within equal reach.
        order.sort_by(|&a, &b| {
            reach[a]
                .partial_cmp(&reach[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.order = order;
    }

    fn depth_of(&self, index: usize, nodes: &[Node], depth: &mut Vec<usize>) -> usize {
        if depth[index] != usize::MAX {
            return depth[index];
        }
        let deepest = nodes[self.members[index].index()]
            .user_before()
            .iter()
            .filter_map(|pred| self.index_of.get(pred))
            .map(|&pred_index| self.depth_of(pred_index, nodes, depth) + 1)
            .max()
            .unwrap_or(0);
        depth[index] = deepest;
        deepest
    }

    /// Execute one pass over the stage to completion.
    ///
    /// Commands recorded by the stage's systems flush into the world after
    /// the last node drains. If the worker pool shuts down mid-stage, the
    /// pass finishes its in-flight work, skips the rest, flushes, and
    /// reports [`ScheduleError::PoolShutdown`].
    pub(crate) fn run(
        &mut self,
        nodes: &[Node],
        world: &mut World,
        pool: &Executor,
    ) -> Result<(), ScheduleError> {
        if self.members.is_empty() {
            return Ok(());
        }

        let buffer = CommandBuffer::new();
        let world_ptr = WorldPtr(world as *mut World);
        let (done_tx, done_rx) = channel::unbounded::<(usize, f64)>();

        let mut pending: Vec<usize> = self.order.clone();
        let mut done = vec![false; self.members.len()];
        let mut in_flight: Vec<(usize, Access)> = Vec::new();
        let mut stopped = false;

        pool.scope(|scope| {
            loop {
                // Fold in any completions that arrived while scanning.
                while let Ok((index, sample)) = done_rx.try_recv() {
                    self.complete(index, sample, &mut in_flight, &mut done);
                }

                if pending.is_empty() && in_flight.is_empty() {
                    break;
                }
                if stopped && in_flight.is_empty() {
                    break;
                }

                match self.pick(nodes, world_ptr, &pending, &done, &in_flight) {
                    Pick::Run(position) => {
                        let index = pending.remove(position);
                        let node = &nodes[self.members[index].index()];

                        if node.main_thread() {
                            // Eligible only while nothing is in flight; run
                            // inline on the dispatcher.
                            trace!("running {} on the driver thread", node.name());
                            let sample = run_node(node, world_ptr, &buffer);
                            self.avg_ms[index] = ewma(self.avg_ms[index], sample);
                            done[index] = true;
                            continue;
                        }

                        trace!("dispatching {}", node.name());
                        in_flight.push((index, node.access().clone()));
                        let tx = done_tx.clone();
                        let buffer = &buffer;
                        let submitted = scope.spawn(move || {
                            let sample = run_node(node, world_ptr, buffer);
                            let _ = tx.send((index, sample));
                        });

                        if submitted.is_err() {
                            // The task never ran; count the node as done and
                            // stop feeding the stage.
                            in_flight.pop();
                            done[index] = true;
                            stopped = true;
                            pending.clear();
                        }
                    }
                    Pick::Skip(position) => {
                        let index = pending.remove(position);
                        let node = &nodes[self.members[index].index()];
                        trace!("skipping {} (condition false)", node.name());
                        done[index] = true;
                    }
                    Pick::Wait => {
                        if in_flight.is_empty() {
                            // Cycle-free edges guarantee an eligible node
                            // whenever nothing is in flight.
                            debug_assert!(
                                pending.is_empty(),
                                "stage runner stalled with no work in flight"
                            );
                            break;
                        }
                        match done_rx.recv() {
                            Ok((index, sample)) => {
                                self.complete(index, sample, &mut in_flight, &mut done);
                            }
                            Err(_) => break,
                        }
                    }
                }
            }
        });

        buffer.flush(world);

        if stopped {
            Err(ScheduleError::PoolShutdown)
        } else {
            Ok(())
        }
    }

    /// Scan the pending list for the first actionable node.
    fn pick(
        &self,
        nodes: &[Node],
        world: WorldPtr,
        pending: &[usize],
        done: &[bool],
        in_flight: &[(usize, Access)],
    ) -> Pick {
        // SAFETY: Conditions read states and stable registries; the
        // transition pass that rewrites them never overlaps a running stage.
        let world = unsafe { &*world.0 };

        for (position, &index) in pending.iter().enumerate() {
            let node = &nodes[self.members[index].index()];

            let preds_done = node.user_before().iter().all(|pred| {
                self.index_of
                    .get(pred)
                    .is_none_or(|&pred_index| done[pred_index])
            });
            if !preds_done {
                continue;
            }

            if !node.conditions().iter().all(|cond| cond.eval(world)) {
                return Pick::Skip(position);
            }

            let compatible = in_flight
                .iter()
                .all(|(_, access)| !access.conflicts_with(node.access()));
            if !compatible {
                continue;
            }

            if node.main_thread() && !in_flight.is_empty() {
                // Picked up once the pool drains.
                continue;
            }

            return Pick::Run(position);
        }

        Pick::Wait
    }

    /// Record an in-flight completion.
    fn complete(
        &mut self,
        index: usize,
        sample: f64,
        in_flight: &mut Vec<(usize, Access)>,
        done: &mut [bool],
    ) {
        if let Some(position) = in_flight.iter().position(|(i, _)| *i == index) {
            in_flight.swap_remove(position);
        }
        done[index] = true;
        self.avg_ms[index] = ewma(self.avg_ms[index], sample);
    }
}

/// Smoothed runtime update.
fn ewma(avg: f64, sample: f64) -> f64 {
    sample * SAMPLE_WEIGHT + avg * (1.0 - SAMPLE_WEIGHT)
}

/// Execute one node against the world, returning the elapsed milliseconds.
fn run_node(node: &Node, world: WorldPtr, buffer: &CommandBuffer) -> f64 {
    let start = Instant::now();
    let mut shard = Shard::new(world.0);
    // SAFETY: The dispatcher guarantees every concurrently running node has
    // a compatible access descriptor, and each node's callable is held by at
    // most one thread at a time.
    unsafe { (*node.system_ptr()).run(&mut shard, buffer) };
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicI32, AtomicU32, Ordering},
        },
        thread,
        time::Duration,
    };

    use cadence_macros::Resource;

    use super::*;
    use crate::{
        app::stage::Stage,
        ecs::{
            schedule::{Condition, node},
            system::{IntoSystem, param::Res, param::ResMut},
        },
    };

    #[derive(Resource)]
    struct Counter(u32);

    struct Fixture {
        nodes: Vec<Node>,
        runner: Runner,
        world: World,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                nodes: Vec::new(),
                runner: Runner::new(Stage::Update.into()),
                world: World::new(),
            }
        }

        fn add<M>(&mut self, system: impl IntoSystem<M>) -> SystemId {
            self.add_node(system, Vec::new(), false)
        }

        fn add_node<M>(
            &mut self,
            system: impl IntoSystem<M>,
            conditions: Vec<Condition>,
            main_thread: bool,
        ) -> SystemId {
            let system = IntoSystem::into_system(system, &mut self.world);
            let id = SystemId::new(self.nodes.len());
            self.nodes.push(node::Node::new(
                Stage::Update.into(),
                system,
                conditions,
                main_thread,
            ));
            self.runner.add(id);
            id
        }

        fn edge(&mut self, before: SystemId, after: SystemId) {
            self.nodes[after.index()].add_before(before);
        }

        fn run(&mut self, workers: usize) {
            let pool = Executor::new(workers);
            self.runner.prepare(&self.nodes);
            self.runner
                .run(&self.nodes, &mut self.world, &pool)
                .unwrap();
        }
    }

    #[test]
    fn empty_stage_completes() {
        let mut fixture = Fixture::new();
        fixture.run(2);
    }

    #[test]
    fn runs_every_node_once() {
        // Given
        let mut fixture = Fixture::new();
        let counter = Arc::new(AtomicU32::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            fixture.add(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        // When
        fixture.run(4);

        // Then
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn user_before_orders_execution() {
        // Given: b waits on a
        let mut fixture = Fixture::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = Arc::clone(&log);
        let a = fixture.add(move || {
            thread::sleep(Duration::from_millis(20));
            log_a.lock().unwrap().push("a");
        });

        let log_b = Arc::clone(&log);
        let b = fixture.add(move || {
            log_b.lock().unwrap().push("b");
        });
        fixture.edge(a, b);

        // When
        fixture.run(4);

        // Then
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn conflicting_nodes_never_overlap() {
        // Given: a writer and a reader of the same resource, with a guard
        // that trips if both are ever inside their system at once.
        let mut fixture = Fixture::new();
        fixture.world.insert_resource(Counter(0));

        let active = Arc::new(AtomicI32::new(0));

        let active_writer = Arc::clone(&active);
        fixture.add(move |mut counter: ResMut<Counter>| {
            assert_eq!(active_writer.fetch_add(1, Ordering::SeqCst), 0);
            thread::sleep(Duration::from_millis(5));
            if let Some(counter) = counter.get_mut() {
                counter.0 += 1;
            }
            active_writer.fetch_sub(1, Ordering::SeqCst);
        });

        let active_reader = Arc::clone(&active);
        fixture.add(move |counter: Res<Counter>| {
            assert_eq!(active_reader.fetch_add(1, Ordering::SeqCst), 0);
            thread::sleep(Duration::from_millis(5));
            let _ = counter.get();
            active_reader.fetch_sub(1, Ordering::SeqCst);
        });

        // When: plenty of workers available
        fixture.run(4);

        // Then
        assert_eq!(fixture.world.resource::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn compatible_nodes_do_overlap() {
        // Given: two readers sleeping 30ms each
        let mut fixture = Fixture::new();
        fixture.world.insert_resource(Counter(0));

        for _ in 0..2 {
            fixture.add(move |_counter: Res<Counter>| {
                thread::sleep(Duration::from_millis(30));
            });
        }

        // When
        let start = Instant::now();
        fixture.run(2);
        let elapsed = start.elapsed();

        // Then: parallel, so well under the 60ms serial time
        assert!(
            elapsed < Duration::from_millis(55),
            "readers should overlap, took {elapsed:?}"
        );
    }

    #[test]
    fn false_condition_skips_node_but_not_successors() {
        // Given: a gated off, b after a
        let mut fixture = Fixture::new();
        let ran = Arc::new(Mutex::new(Vec::new()));

        let ran_a = Arc::clone(&ran);
        let a = fixture.add_node(
            move || {
                ran_a.lock().unwrap().push("a");
            },
            vec![Condition::new(|_| false)],
            false,
        );

        let ran_b = Arc::clone(&ran);
        let b = fixture.add(move || {
            ran_b.lock().unwrap().push("b");
        });
        fixture.edge(a, b);

        // When
        fixture.run(2);

        // Then
        assert_eq!(*ran.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn main_thread_node_runs_on_dispatcher() {
        // Given
        let mut fixture = Fixture::new();
        let driver = thread::current().id();
        let observed = Arc::new(Mutex::new(None));

        let observed_clone = Arc::clone(&observed);
        fixture.add_node(
            move || {
                *observed_clone.lock().unwrap() = Some(thread::current().id());
            },
            Vec::new(),
            true,
        );

        // And some worker-bound noise
        for _ in 0..4 {
            fixture.add(move || {
                thread::sleep(Duration::from_millis(2));
            });
        }

        // When
        fixture.run(2);

        // Then
        assert_eq!(*observed.lock().unwrap(), Some(driver));
    }

    #[test]
    fn commands_flush_at_end_of_stage() {
        use crate::ecs::system::param::Commands;
        use cadence_macros::Component;

        #[derive(Component)]
        struct Spawned;

        // Given
        let mut fixture = Fixture::new();
        fixture.add(move |commands: Commands| {
            commands.spawn(Spawned);
        });

        // When
        fixture.run(2);

        // Then
        assert_eq!(fixture.world.entity_count(), 1);
    }

    #[test]
    fn pool_shutdown_aborts_the_stage() {
        // Given
        let mut fixture = Fixture::new();
        let ran = Arc::new(AtomicU32::new(0));
        for _ in 0..4 {
            let ran = Arc::clone(&ran);
            fixture.add(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }

        let pool = Executor::new(2);
        pool.shutdown();

        // When
        fixture.runner.prepare(&fixture.nodes);
        let result = fixture
            .runner
            .run(&fixture.nodes, &mut fixture.world, &pool);

        // Then
        assert!(matches!(result, Err(ScheduleError::PoolShutdown)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scan_order_prefers_long_chains() {
        // Given: a chain a -> b and a free node c; after one timed pass the
        // chain head has non-zero reach on its successor and stays ahead in
        // the scan order.
        let mut fixture = Fixture::new();
        let a = fixture.add(move || {
            thread::sleep(Duration::from_millis(10));
        });
        let b = fixture.add(move || {});
        let c = fixture.add(move || {});
        fixture.edge(a, b);
        let _ = c;

        // When: two prepared passes
        fixture.run(2);
        fixture.runner.prepare(&fixture.nodes);

        // Then: b (reach > 0) sorts after the zero-reach nodes
        assert_eq!(fixture.runner.order.last(), Some(&b.index()));
    }
}
