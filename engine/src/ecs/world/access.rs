//! Access descriptors and conflict detection for system scheduling.
//!
//! Every system carries an [`Access`] summarising what it reads and writes:
//! component types per query (split into mutable includes, read-only includes,
//! and excludes), resources, events, and states, plus flags for command
//! recording and query presence. The stage runner compares descriptors with
//! [`Access::conflicts_with`] to decide which systems may overlap in time.
//!
//! # Conflict Rules
//!
//! Two descriptors conflict when any of the following holds:
//!
//! 1. One records commands and the other records commands or runs queries.
//! 2. Both run queries, and some pair of query triples mutually includes an
//!    overlapping component type with at least one side mutable, and neither
//!    side's exclude set separates the matched entity sets.
//! 3. One writes a resource the other reads or writes.
//! 4. An event type appears on both sides with at least one writer.
//! 5. Both propose the next value of the same state type.
//!
//! Compatible systems may run concurrently; the runner never overlaps
//! conflicting ones regardless of user-declared ordering.
//!
//! ```rust,ignore
//! let mut writes_x = Access::new();
//! writes_x.add_resource_mut(token_x);
//!
//! let mut reads_x = Access::new();
//! reads_x.add_resource_ro(token_x);
//!
//! assert!(writes_x.conflicts_with(&reads_x));
//! assert!(!reads_x.conflicts_with(&reads_x));
//! ```

use fixedbitset::FixedBitSet;

use crate::ecs::world::registry::TypeToken;

/// Bitset over [`TypeToken`]s for fast overlap checks.
///
/// The bitset grows to accommodate any token index, keeping the conflict
/// check a handful of word-wise intersections regardless of how many types a
/// program registers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TypeSet {
    bits: FixedBitSet,
}

impl TypeSet {
    /// An empty set.
    pub const EMPTY: Self = Self {
        bits: FixedBitSet::new(),
    };

    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token into the set.
    pub fn insert(&mut self, token: TypeToken) {
        let index = token.index();
        self.bits.grow(index + 1);
        self.bits.insert(index);
    }

    /// Returns `true` if the set contains the token.
    #[inline]
    pub fn contains(&self, token: TypeToken) -> bool {
        self.bits.contains(token.index())
    }

    /// Returns `true` if the set contains no tokens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    /// Returns `true` if the two sets share at least one token.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.bits.is_disjoint(&other.bits)
    }

    /// Merge another set into this one.
    pub fn union_with(&mut self, other: &Self) {
        self.bits.union_with(&other.bits);
    }

    /// The union of two sets.
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.union_with(other);
        merged
    }

    /// The number of tokens in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }
}

/// The component footprint of a single query parameter.
///
/// Includes are split by mutability; excludes narrow the matched entity set.
/// A system with several query parameters carries one triple per query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryAccess {
    /// Component types fetched mutably.
    pub include_mut: TypeSet,

    /// Component types fetched or filtered read-only.
    pub include_ro: TypeSet,

    /// Component types the query requires to be absent.
    pub exclude: TypeSet,
}

impl QueryAccess {
    /// Create an empty triple.
    pub fn new() -> Self {
        Self::default()
    }

    /// All included component types, regardless of mutability.
    pub fn includes(&self) -> TypeSet {
        self.include_mut.union(&self.include_ro)
    }

    /// Returns `true` if the excludes of either triple guarantee disjoint
    /// entity sets: an entity matched by one query cannot be matched by the
    /// other when one side requires a component the other side forbids.
    fn separated_from(&self, other: &Self) -> bool {
        self.exclude.intersects(&other.includes()) || other.exclude.intersects(&self.includes())
    }

    /// Returns `true` if the two triples may touch the same component data of
    /// the same entity with at least one mutable access.
    fn contends_with(&self, other: &Self) -> bool {
        let mutable_overlap = self.include_mut.intersects(&other.include_mut)
            || self.include_mut.intersects(&other.include_ro)
            || other.include_mut.intersects(&self.include_ro);
        mutable_overlap && !self.separated_from(other)
    }
}

/// A static summary of everything one system reads and writes.
///
/// Built by merging the access of every system parameter at registration time
/// and immutable afterwards. The runner treats the descriptor as the single
/// source of aliasing discipline: systems whose descriptors conflict are never
/// in flight together.
#[derive(Debug, Default, Clone)]
pub struct Access {
    /// The system records deferred commands.
    has_command: bool,

    /// The system runs at least one query.
    has_query: bool,

    /// One component triple per query parameter.
    queries: Vec<QueryAccess>,

    /// Resources read.
    resource_ro: TypeSet,

    /// Resources written.
    resource_mut: TypeSet,

    /// Event types read.
    event_read: TypeSet,

    /// Event types written.
    event_write: TypeSet,

    /// State types whose current value is read.
    state_read: TypeSet,

    /// State types whose next value is proposed.
    state_next: TypeSet,
}

impl Access {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the system as recording commands.
    pub fn set_command(&mut self) {
        self.has_command = true;
    }

    /// Returns `true` if the system records commands.
    #[inline]
    pub fn has_command(&self) -> bool {
        self.has_command
    }

    /// Returns `true` if the system runs queries.
    #[inline]
    pub fn has_query(&self) -> bool {
        self.has_query
    }

    /// Add one query triple.
    pub fn push_query(&mut self, query: QueryAccess) {
        self.has_query = true;
        self.queries.push(query);
    }

    /// Add a read-only resource dependency.
    pub fn add_resource_ro(&mut self, token: TypeToken) {
        self.resource_ro.insert(token);
    }

    /// Add a mutable resource dependency.
    pub fn add_resource_mut(&mut self, token: TypeToken) {
        self.resource_mut.insert(token);
    }

    /// Add an event-read dependency.
    pub fn add_event_read(&mut self, token: TypeToken) {
        self.event_read.insert(token);
    }

    /// Add an event-write dependency.
    pub fn add_event_write(&mut self, token: TypeToken) {
        self.event_write.insert(token);
    }

    /// Add a state-read dependency.
    pub fn add_state_read(&mut self, token: TypeToken) {
        self.state_read.insert(token);
    }

    /// Add a next-state-write dependency.
    pub fn add_state_next(&mut self, token: TypeToken) {
        self.state_next.insert(token);
    }

    /// Returns `true` if the descriptor declares no access at all.
    pub fn is_empty(&self) -> bool {
        !self.has_command
            && !self.has_query
            && self.resource_ro.is_empty()
            && self.resource_mut.is_empty()
            && self.event_read.is_empty()
            && self.event_write.is_empty()
            && self.state_read.is_empty()
            && self.state_next.is_empty()
    }

    /// Merge another descriptor into a new one, combining both footprints.
    ///
    /// Used to fold the access of each system parameter into the system's
    /// descriptor.
    pub fn merge(&self, other: &Self) -> Self {
        let mut queries = self.queries.clone();
        queries.extend(other.queries.iter().cloned());
        Self {
            has_command: self.has_command || other.has_command,
            has_query: self.has_query || other.has_query,
            queries,
            resource_ro: self.resource_ro.union(&other.resource_ro),
            resource_mut: self.resource_mut.union(&other.resource_mut),
            event_read: self.event_read.union(&other.event_read),
            event_write: self.event_write.union(&other.event_write),
            state_read: self.state_read.union(&other.state_read),
            state_next: self.state_next.union(&other.state_next),
        }
    }

    /// Returns `true` if the two descriptors may not be in flight together.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        // Commands serialize against other command recorders and all queries:
        // the flush mutates entity structure that queries observe.
        if self.has_command && (other.has_command || other.has_query) {
            return true;
        }
        if other.has_command && self.has_query {
            return true;
        }

        // Query-against-query component contention, pairwise over triples.
        if self.has_query && other.has_query {
            for mine in &self.queries {
                for theirs in &other.queries {
                    if mine.contends_with(theirs) {
                        return true;
                    }
                }
            }
        }

        // Resource writer against any other resource access.
        if self.resource_mut.intersects(&other.resource_mut)
            || self.resource_mut.intersects(&other.resource_ro)
            || other.resource_mut.intersects(&self.resource_ro)
        {
            return true;
        }

        // Event writer against any other access to the same event type.
        if self.event_write.intersects(&other.event_write)
            || self.event_write.intersects(&other.event_read)
            || other.event_write.intersects(&self.event_read)
        {
            return true;
        }

        // Two proposals for the same next state.
        if self.state_next.intersects(&other.state_next) {
            return true;
        }

        false
    }
}
