//! Temporal properties under weak fairness.
//!
//! Both temporal properties reduce to the same question: does some weakly
//! fair behaviour eventually stay forever inside a "bad" region of states?
//! For "P holds infinitely often" the bad region is `!P`; for "not eventually
//! always P" it is `P` itself.
//!
//! The search decomposes the bad region of the explored graph into strongly
//! connected components. A component admits a fair behaviour that never
//! leaves it exactly when either
//!
//! - some state in it has no enabled fairness class, so stuttering there
//!   forever is fair, or
//! - it has an internal edge, and every fairness class enabled somewhere in
//!   it is disabled at some state of the component or labels an internal
//!   edge.
//!
//! Enabledness means having a non-stuttering successor, matching TLA+'s
//! `ENABLED <<A>>_vars`. Only fully expanded states take part.

mod tarjan;

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    fmt::Debug,
    hash::Hash,
};

use stateright::Model;

pub use self::tarjan::strongly_connected_components;
use crate::{
    explorer::graph::{Edge, NodeId, StateGraph},
    verdict::ViolationKind,
};

/// A [`Model`] whose actions are grouped into weakly fair classes.
pub trait FairModel: Model {
    /// Identifier of a weakly fair class of actions.
    type Fairness: Copy + Debug + Eq + Hash + Ord;

    /// Returns the fairness class of `action`, or `None` when the action is
    /// never required to happen.
    fn fairness(&self, action: &Self::Action) -> Option<Self::Fairness>;

    /// Returns the label printed for `action` in traces.
    fn action_label(&self, action: &Self::Action) -> String;

    /// Returns the properties checked over fair infinite behaviours.
    fn temporal_properties(&self) -> Vec<TemporalProperty<Self>>;
}

/// Shape of a temporal property.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TemporalKind {
    /// `[]<>P`: the condition recurs forever.
    InfinitelyOften,
    /// `~<>[]P`: the condition never holds permanently.
    NotForever,
}

impl TemporalKind {
    /// Returns the violation class reported when the property fails.
    #[must_use]
    pub const fn violation_kind(self) -> ViolationKind {
        match self {
            Self::InfinitelyOften => ViolationKind::Liveness,
            Self::NotForever => ViolationKind::Safety,
        }
    }
}

/// A temporal property over fair infinite behaviours.
pub struct TemporalProperty<M: Model> {
    /// Property name.
    pub name: &'static str,
    /// Shape of the property.
    pub kind: TemporalKind,
    /// State condition the shape refers to.
    pub condition: fn(&M, &M::State) -> bool,
}

impl<M: Model> TemporalProperty<M> {
    /// `condition` must hold infinitely often on every fair behaviour.
    #[must_use]
    pub const fn infinitely_often(name: &'static str, condition: fn(&M, &M::State) -> bool) -> Self {
        Self {
            name,
            kind: TemporalKind::InfinitelyOften,
            condition,
        }
    }

    /// No fair behaviour may satisfy `condition` from some point on forever.
    #[must_use]
    pub const fn not_forever(name: &'static str, condition: fn(&M, &M::State) -> bool) -> Self {
        Self {
            name,
            kind: TemporalKind::NotForever,
            condition,
        }
    }

    /// Returns `true` when `state` lies in the region a violating behaviour
    /// must stay in forever.
    pub fn in_bad_region(&self, model: &M, state: &M::State) -> bool {
        let holds = (self.condition)(model, state);
        match self.kind {
            TemporalKind::InfinitelyOften => !holds,
            TemporalKind::NotForever => holds,
        }
    }
}

/// A fair behaviour that stays in a bad region forever.
#[derive(Debug)]
pub struct FairLasso<'g, A> {
    /// First state of the repeating part; reached by a shortest path.
    pub entry: NodeId,
    /// Edges of the repeating part, starting and ending at `entry`.
    pub cycle: Vec<&'g Edge<A>>,
    /// `true` when the behaviour stutters at `entry` forever instead.
    pub stutters: bool,
}

/// Graph type explored for a [`FairModel`].
pub type ModelGraph<M> =
    StateGraph<<M as Model>::State, <M as Model>::Action, <M as FairModel>::Fairness>;

/// Searches the explored graph for a fair behaviour violating `property`.
///
/// Among all violating components the one closest to an initial state is
/// reported.
pub fn find_fair_lasso<'g, M>(
    model: &'g M,
    graph: &'g ModelGraph<M>,
    property: &TemporalProperty<M>,
) -> Option<FairLasso<'g, M::Action>>
where
    M: FairModel,
    M::State: Clone + Eq + Hash,
{
    let members: Vec<NodeId> = graph
        .node_ids()
        .filter(|&node| graph.is_expanded(node) && property.in_bad_region(model, graph.state(node)))
        .collect();
    let local: HashMap<NodeId, usize> = members
        .iter()
        .enumerate()
        .map(|(position, &node)| (node, position))
        .collect();
    let adjacency: Vec<Vec<usize>> = members
        .iter()
        .map(|&node| {
            graph
                .edges(node)
                .iter()
                .filter_map(|edge| local.get(&edge.target).copied())
                .collect()
        })
        .collect();

    strongly_connected_components(&adjacency)
        .into_iter()
        .filter_map(|component| {
            let nodes: Vec<NodeId> = component
                .into_iter()
                .filter_map(|position| members.get(position).copied())
                .collect();
            Component::new(model, graph, nodes).fair_lasso()
        })
        .min_by_key(|lasso| graph.depth(lasso.entry))
}

enum Obligation<F> {
    /// Pass through a state where the class is disabled.
    Visit(F),
    /// Take an internal edge labelled with the class.
    Take(F),
}

struct Component<'g, M: FairModel> {
    model: &'g M,
    graph: &'g ModelGraph<M>,
    nodes: Vec<NodeId>,
    members: HashSet<NodeId>,
}

impl<'g, M> Component<'g, M>
where
    M: FairModel,
    M::State: Clone + Eq + Hash,
{
    fn new(model: &'g M, graph: &'g ModelGraph<M>, nodes: Vec<NodeId>) -> Self {
        let members = nodes.iter().copied().collect();
        Self {
            model,
            graph,
            nodes,
            members,
        }
    }

    fn internal_edges(&self, node: NodeId) -> impl Iterator<Item = &'g Edge<M::Action>> + '_ {
        self.graph
            .edges(node)
            .iter()
            .filter(|edge| self.members.contains(&edge.target))
    }

    fn takes(&self, class: M::Fairness) -> bool {
        self.nodes.iter().any(|&node| {
            self.internal_edges(node)
                .any(|edge| self.model.fairness(&edge.action) == Some(class))
        })
    }

    fn entry(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .copied()
            .min_by_key(|&node| self.graph.depth(node))
    }

    fn fair_lasso(&self) -> Option<FairLasso<'g, M::Action>> {
        if let Some(entry) = self
            .nodes
            .iter()
            .copied()
            .filter(|&node| self.graph.enabled(node).is_empty())
            .min_by_key(|&node| self.graph.depth(node))
        {
            return Some(FairLasso {
                entry,
                cycle: Vec::new(),
                stutters: true,
            });
        }

        let has_internal_edge = self
            .nodes
            .iter()
            .any(|&node| self.internal_edges(node).next().is_some());
        if !has_internal_edge {
            return None;
        }

        let obligations = self.obligations()?;
        let entry = self.entry()?;
        let cycle = self.close_cycle(entry, &obligations)?;
        Some(FairLasso {
            entry,
            cycle,
            stutters: false,
        })
    }

    /// Returns what a cycle must do to be weakly fair, or `None` when some
    /// class is enabled throughout the component but never taken inside it.
    fn obligations(&self) -> Option<Vec<Obligation<M::Fairness>>> {
        let enabled_somewhere: BTreeSet<M::Fairness> = self
            .nodes
            .iter()
            .flat_map(|&node| self.graph.enabled(node).iter().copied())
            .collect();

        enabled_somewhere
            .into_iter()
            .map(|class| {
                let disabled_somewhere = self
                    .nodes
                    .iter()
                    .any(|&node| !self.graph.enabled(node).contains(&class));
                if disabled_somewhere {
                    Some(Obligation::Visit(class))
                } else if self.takes(class) {
                    Some(Obligation::Take(class))
                } else {
                    None
                }
            })
            .collect()
    }

    fn close_cycle(
        &self,
        entry: NodeId,
        obligations: &[Obligation<M::Fairness>],
    ) -> Option<Vec<&'g Edge<M::Action>>> {
        let mut cycle = Vec::new();
        let mut current = entry;

        for obligation in obligations {
            match *obligation {
                Obligation::Visit(class) => {
                    let path = self.route(current, |node| {
                        !self.graph.enabled(node).contains(&class)
                    })?;
                    current = path.last().map_or(current, |edge| edge.target);
                    cycle.extend(path);
                }
                Obligation::Take(class) => {
                    let path = self.route(current, |node| {
                        self.internal_edges(node)
                            .any(|edge| self.model.fairness(&edge.action) == Some(class))
                    })?;
                    current = path.last().map_or(current, |edge| edge.target);
                    cycle.extend(path);
                    let edge = self
                        .internal_edges(current)
                        .find(|edge| self.model.fairness(&edge.action) == Some(class))?;
                    current = edge.target;
                    cycle.push(edge);
                }
            }
        }

        if cycle.is_empty() {
            let edge = self.internal_edges(entry).next()?;
            current = edge.target;
            cycle.push(edge);
        }
        cycle.extend(self.route(current, |node| node == entry)?);
        Some(cycle)
    }

    /// Shortest path inside the component from `from` to a node satisfying
    /// `goal`. Empty when `from` already satisfies it.
    fn route(
        &self,
        from: NodeId,
        goal: impl Fn(NodeId) -> bool,
    ) -> Option<Vec<&'g Edge<M::Action>>> {
        if goal(from) {
            return Some(Vec::new());
        }
        let mut came_from: HashMap<NodeId, (NodeId, &'g Edge<M::Action>)> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for edge in self.internal_edges(node) {
                if edge.target == from || came_from.contains_key(&edge.target) {
                    continue;
                }
                came_from.insert(edge.target, (node, edge));
                if goal(edge.target) {
                    return Some(unwind(&came_from, from, edge.target));
                }
                queue.push_back(edge.target);
            }
        }
        None
    }
}

fn unwind<'g, A>(
    came_from: &HashMap<NodeId, (NodeId, &'g Edge<A>)>,
    from: NodeId,
    to: NodeId,
) -> Vec<&'g Edge<A>> {
    let mut path = Vec::new();
    let mut current = to;
    while current != from {
        let Some(&(previous, edge)) = came_from.get(&current) else {
            break;
        };
        path.push(edge);
        current = previous;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests;
