//! Explicit state graph recorded during breadth-first exploration.
//!
//! Nodes are dense indices in discovery order, so BFS depth is monotone in
//! the node id and the parent links form a shortest-path tree.

#![expect(
    clippy::indexing_slicing,
    reason = "node ids are dense indices handed out by this graph"
)]

use std::{collections::HashMap, hash::Hash, ops::Range};

/// Dense identifier of a discovered state.
pub type NodeId = usize;

/// A recorded non-stuttering transition.
#[derive(Clone, Debug)]
pub struct Edge<A> {
    /// Action that fired.
    pub action: A,
    /// Successor node.
    pub target: NodeId,
}

#[derive(Debug)]
struct Node<S, A, F> {
    state: S,
    depth: usize,
    parent: Option<(NodeId, usize)>,
    edges: Vec<Edge<A>>,
    enabled: Vec<F>,
    expanded: bool,
}

/// States, transitions, and per-state fairness bookkeeping.
#[derive(Debug)]
pub struct StateGraph<S, A, F> {
    nodes: Vec<Node<S, A, F>>,
    index: HashMap<S, NodeId>,
}

impl<S, A, F> Default for StateGraph<S, A, F> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<S, A, F> StateGraph<S, A, F>
where
    S: Clone + Eq + Hash,
{
    /// Returns the number of discovered states.
    #[must_use]
    pub fn len(&self) -> usize { self.nodes.len() }

    /// Returns `true` when nothing has been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Returns every node id in discovery order.
    #[must_use]
    pub fn node_ids(&self) -> Range<NodeId> { 0..self.nodes.len() }

    /// Looks up the node holding `state`.
    #[must_use]
    pub fn lookup(&self, state: &S) -> Option<NodeId> { self.index.get(state).copied() }

    /// Records an initial state. Returns the node and whether it is new.
    pub fn add_initial(&mut self, state: S) -> (NodeId, bool) {
        if let Some(node) = self.lookup(&state) {
            return (node, false);
        }
        (self.insert(state, 0, None), true)
    }

    /// Records the transition `from --action--> state`.
    ///
    /// Returns the successor node and whether it was discovered just now; a
    /// new node's parent link is this edge.
    pub fn add_successor(&mut self, from: NodeId, action: A, state: S) -> (NodeId, bool) {
        let edge_index = self.nodes[from].edges.len();
        let (target, fresh) = match self.lookup(&state) {
            Some(existing) => (existing, false),
            None => {
                let depth = self.nodes[from].depth.saturating_add(1);
                (self.insert(state, depth, Some((from, edge_index))), true)
            }
        };
        self.nodes[from].edges.push(Edge { action, target });
        (target, fresh)
    }

    /// Marks `node` as processed, recording its enabled fairness classes.
    ///
    /// `complete` is `false` when some successor was dropped by the state
    /// budget; such nodes are excluded from temporal analysis.
    pub fn finish(&mut self, node: NodeId, enabled: Vec<F>, complete: bool) {
        let entry = &mut self.nodes[node];
        entry.enabled = enabled;
        entry.expanded = complete;
    }

    fn insert(&mut self, state: S, depth: usize, parent: Option<(NodeId, usize)>) -> NodeId {
        let node = self.nodes.len();
        self.index.insert(state.clone(), node);
        self.nodes.push(Node {
            state,
            depth,
            parent,
            edges: Vec::new(),
            enabled: Vec::new(),
            expanded: false,
        });
        node
    }
}

impl<S, A, F> StateGraph<S, A, F> {
    /// Returns the state held by `node`.
    #[must_use]
    pub fn state(&self, node: NodeId) -> &S { &self.nodes[node].state }

    /// Returns the BFS depth of `node`.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize { self.nodes[node].depth }

    /// Returns the recorded outgoing transitions of `node`.
    #[must_use]
    pub fn edges(&self, node: NodeId) -> &[Edge<A>] { &self.nodes[node].edges }

    /// Returns the fairness classes with a non-stuttering successor at `node`.
    #[must_use]
    pub fn enabled(&self, node: NodeId) -> &[F] { &self.nodes[node].enabled }

    /// Returns `true` when every successor of `node` was recorded.
    #[must_use]
    pub fn is_expanded(&self, node: NodeId) -> bool { self.nodes[node].expanded }

    /// Returns the shortest path from an initial state to `node`.
    ///
    /// Each element pairs the edge taken into a node with that node; the first
    /// element is the initial state and has no edge.
    #[must_use]
    pub fn path_to(&self, node: NodeId) -> Vec<(Option<&Edge<A>>, NodeId)> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some((parent, edge_index)) = self.nodes[current].parent {
            path.push((Some(&self.nodes[parent].edges[edge_index]), current));
            current = parent;
        }
        path.push((None, current));
        path.reverse();
        path
    }
}
