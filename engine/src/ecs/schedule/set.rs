//! System sets: user-defined orderings over groups of systems.
//!
//! A set type is any small value type (typically an enum); configuring an
//! order over its values makes every node in an earlier value a predecessor
//! of every same-stage node in a later value. Ordering is per set-type only;
//! different set types never interact.
//!
//! ```rust,ignore
//! #[derive(Clone, PartialEq, Debug)]
//! enum Phase { Input, Simulate, Render }
//!
//! app.configure_sets([Phase::Input, Phase::Simulate, Phase::Render])?;
//! app.system(Stage::Update, read_pad).in_set(Phase::Input).register()?;
//! app.system(Stage::Update, integrate).in_set(Phase::Simulate).register()?;
//! ```

use std::{any::Any, any::TypeId as StdTypeId, collections::HashMap, fmt};

use crate::ecs::schedule::{SystemId, node::Node};

/// A value usable as a system-set tag.
///
/// Blanket-implemented for every comparable, cloneable, printable value
/// type; enums with `#[derive(Clone, PartialEq, Debug)]` qualify as-is.
pub trait SystemSet: PartialEq + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T: PartialEq + Clone + fmt::Debug + Send + Sync + 'static> SystemSet for T {}

/// A boxed set value.
pub(crate) type SetValue = Box<dyn Any + Send + Sync>;

/// Type-erased equality over two boxed values of the same set type.
pub(crate) type SetEq = fn(&dyn Any, &dyn Any) -> bool;

/// Monomorphised equality used as the erased comparator of a set type.
pub(crate) fn set_value_eq<S: SystemSet>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<S>(), b.downcast_ref::<S>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// One node's membership in a set.
struct Membership {
    node: SystemId,
    value: SetValue,
}

/// All knowledge about one set type: its configured order and its members.
struct Group {
    eq: SetEq,
    order: Vec<SetValue>,
    members: Vec<Membership>,
}

impl Group {
    /// The position of `value` in the configured order, if any.
    fn ordinal(&self, value: &dyn Any) -> Option<usize> {
        self.order.iter().position(|v| (self.eq)(v.as_ref(), value))
    }
}

/// Registry of set types, their value orders, and node memberships.
///
/// Ordering edges are materialised eagerly: configuring an order adds edges
/// among existing members, and joining a set adds edges against the members
/// already present.
#[derive(Default)]
pub struct SetRegistry {
    groups: HashMap<StdTypeId, Group>,
}

impl SetRegistry {
    /// Declare the total order of a set type's values.
    ///
    /// Adds a predecessor edge for every same-stage member pair whose values
    /// are ordered, and returns the edges that were actually new so the
    /// caller can roll them back if they close a cycle.
    pub(crate) fn configure<S: SystemSet>(
        &mut self,
        values: Vec<S>,
        nodes: &mut [Node],
    ) -> Vec<(SystemId, SystemId)> {
        let group = self
            .groups
            .entry(StdTypeId::of::<S>())
            .or_insert_with(|| Group {
                eq: set_value_eq::<S>,
                order: Vec::new(),
                members: Vec::new(),
            });
        group.order = values
            .into_iter()
            .map(|v| Box::new(v) as SetValue)
            .collect();

        let mut added = Vec::new();
        for first in 0..group.members.len() {
            for second in 0..group.members.len() {
                if first == second {
                    continue;
                }
                let a = &group.members[first];
                let b = &group.members[second];
                if nodes[a.node.index()].stage() != nodes[b.node.index()].stage() {
                    continue;
                }
                let (Some(ord_a), Some(ord_b)) = (
                    group.ordinal(a.value.as_ref()),
                    group.ordinal(b.value.as_ref()),
                ) else {
                    continue;
                };
                if ord_a < ord_b && nodes[b.node.index()].add_before(a.node) {
                    added.push((a.node, b.node));
                }
            }
        }
        added
    }

    /// Record that `node` belongs to the given set value, inserting ordering
    /// edges against existing same-stage members when the set type has a
    /// configured order.
    pub(crate) fn join(
        &mut self,
        set_type: StdTypeId,
        value: SetValue,
        eq: SetEq,
        node: SystemId,
        nodes: &mut [Node],
    ) {
        let group = self.groups.entry(set_type).or_insert_with(|| Group {
            eq,
            order: Vec::new(),
            members: Vec::new(),
        });

        if let Some(own_ordinal) = group.ordinal(value.as_ref()) {
            for member in &group.members {
                if nodes[member.node.index()].stage() != nodes[node.index()].stage() {
                    continue;
                }
                let Some(member_ordinal) = group.ordinal(member.value.as_ref()) else {
                    continue;
                };
                if member_ordinal < own_ordinal {
                    nodes[node.index()].add_before(member.node);
                } else if member_ordinal > own_ordinal {
                    nodes[member.node.index()].add_before(node);
                }
            }
        }

        group.members.push(Membership { node, value });
    }

    /// Drop every membership of `node`, as part of registration rollback.
    pub(crate) fn remove_member(&mut self, node: SystemId) {
        for group in self.groups.values_mut() {
            group.members.retain(|member| member.node != node);
        }
    }
}
