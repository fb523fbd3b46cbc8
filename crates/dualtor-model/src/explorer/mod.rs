//! Explicit-state breadth-first explorer.
//!
//! The explorer enumerates every state reachable from a model's initial
//! states, evaluates invariants on each new state, and records the graph the
//! fairness checker needs: non-stuttering edges plus, per state, the fairness
//! classes with a non-stuttering successor. Breadth-first order makes every
//! counterexample prefix a shortest path.

pub mod graph;

use std::{
    collections::{BTreeSet, VecDeque},
    fmt::Debug,
    hash::Hash,
    str::FromStr,
};

use bitflags::bitflags;
use stateright::{Expectation, Property};
use tracing::{debug, info, warn};

use self::graph::NodeId;
use crate::{
    error::ConfigError,
    fairness::{FairModel, FairLasso, ModelGraph, TemporalKind, find_fair_lasso},
    verdict::{
        CheckReport,
        Coverage,
        ExplorationStats,
        InconclusiveReason,
        Trace,
        TraceStep,
        Verdict,
        Violation,
        ViolationKind,
    },
};

const PROGRESS_INTERVAL: usize = 10_000;

bitflags! {
    /// Property classes a check evaluates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertySelection: u8 {
        /// State invariants.
        const INVARIANTS = 1 << 0;
        /// "Not forever" temporal properties.
        const SAFETY = 1 << 1;
        /// "Infinitely often" temporal properties.
        const LIVENESS = 1 << 2;
    }
}

impl Default for PropertySelection {
    fn default() -> Self { Self::all() }
}

const PROPERTY_NAMES: [(&str, PropertySelection); 3] = [
    ("invariants", PropertySelection::INVARIANTS),
    ("safety", PropertySelection::SAFETY),
    ("liveness", PropertySelection::LIVENESS),
];

impl PropertySelection {
    /// Returns `true` when temporal properties of `kind` are selected.
    #[must_use]
    pub const fn includes(self, kind: TemporalKind) -> bool {
        match kind {
            TemporalKind::InfinitelyOften => self.contains(Self::LIVENESS),
            TemporalKind::NotForever => self.contains(Self::SAFETY),
        }
    }

    /// Returns the configuration names of the selected classes.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        PROPERTY_NAMES
            .iter()
            .filter(|(_, class)| self.contains(*class))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl FromStr for PropertySelection {
    type Err = ConfigError;

    /// Parses `all` or a comma-separated list of property classes.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim() == "all" {
            return Ok(Self::all());
        }
        let selection = value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Self::empty(), |selected, name| {
                PROPERTY_NAMES
                    .iter()
                    .find(|(known, _)| *known == name)
                    .map(|(_, class)| selected | *class)
                    .ok_or_else(|| ConfigError::UnknownValue {
                        key: "properties",
                        value: name.to_owned(),
                        expected: "all, or a list of invariants, safety, liveness",
                    })
            })?;
        if selection.is_empty() {
            return Err(ConfigError::NoProperties);
        }
        Ok(selection)
    }
}

/// Limits and property selection for an exhaustive check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExploreOptions {
    /// Maximum number of distinct states to discover.
    pub max_states: usize,
    /// States at this depth are not expanded.
    pub max_depth: Option<usize>,
    /// Property classes to evaluate.
    pub properties: PropertySelection,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            max_depth: None,
            properties: PropertySelection::all(),
        }
    }
}

/// Everything breadth-first search learned about a model.
pub struct Exploration<M: FairModel> {
    /// The explored graph.
    pub graph: ModelGraph<M>,
    /// Counters.
    pub stats: ExplorationStats,
    /// Why the search stopped early, if it did.
    pub cut: Option<InconclusiveReason>,
    /// First invariant violation, which stops the search.
    pub invariant_violation: Option<Violation<M::State>>,
    /// Names of reachability properties witnessed.
    pub reached: BTreeSet<&'static str>,
    /// Most recently discovered node, which has the greatest depth.
    pub deepest: Option<NodeId>,
}

/// Runs breadth-first search over `model`.
pub fn explore<M>(model: &M, options: &ExploreOptions) -> Exploration<M>
where
    M: FairModel,
    M::State: Clone + Debug + Eq + Hash,
    M::Action: Clone,
{
    Search::new(model, options).run()
}

/// Explores `model` and evaluates the selected properties.
///
/// Invariant violations stop the search with the shortest counterexample.
/// Temporal properties are analysed on the explored graph afterwards;
/// violations found there are genuine even when the search was cut short.
pub fn check<M>(model: &M, options: &ExploreOptions) -> CheckReport<M::State>
where
    M: FairModel,
    M::State: Clone + Debug + Eq + Hash,
    M::Action: Clone,
{
    info!(
        max_states = options.max_states,
        max_depth = ?options.max_depth,
        properties = ?options.properties.names(),
        "starting exhaustive exploration"
    );
    let exploration = explore(model, options);
    let mut violations = Vec::new();

    if let Some(violation) = exploration.invariant_violation.clone() {
        violations.push(violation);
    } else {
        for property in model.temporal_properties() {
            if !options.properties.includes(property.kind) {
                continue;
            }
            if let Some(lasso) = find_fair_lasso(model, &exploration.graph, &property) {
                violations.push(Violation {
                    property: property.name,
                    kind: property.kind.violation_kind(),
                    trace: lasso_trace(model, &exploration.graph, &lasso),
                });
            }
        }
    }

    for violation in &violations {
        info!(
            property = violation.property,
            kind = %violation.kind,
            depth = violation.trace.depth(),
            "property violated"
        );
    }

    let verdict = if !violations.is_empty() {
        Verdict::Violated(violations)
    } else if let Some(reason) = exploration.cut {
        Verdict::Inconclusive(reason)
    } else {
        Verdict::Verified
    };

    let coverage = model
        .properties()
        .into_iter()
        .filter(|property| matches!(property.expectation, Expectation::Sometimes))
        .map(|property| Coverage {
            property: property.name,
            reached: exploration.reached.contains(property.name),
        })
        .collect();
    let deepest_trace = exploration
        .cut
        .and(exploration.deepest)
        .map(|node| prefix_trace(model, &exploration.graph, node));

    info!(
        states = exploration.stats.states,
        transitions = exploration.stats.transitions,
        complete = exploration.stats.complete,
        "exploration finished"
    );

    CheckReport {
        verdict,
        stats: exploration.stats,
        coverage,
        deepest_trace,
    }
}

/// Builds the trace of the shortest path from an initial state to `node`.
pub fn prefix_trace<M>(model: &M, graph: &ModelGraph<M>, node: NodeId) -> Trace<M::State>
where
    M: FairModel,
    M::State: Clone,
{
    let steps = graph
        .path_to(node)
        .into_iter()
        .map(|(edge, target)| TraceStep {
            action: edge.map(|e| model.action_label(&e.action)),
            state: graph.state(target).clone(),
        })
        .collect();
    Trace::finite(steps)
}

fn lasso_trace<M>(
    model: &M,
    graph: &ModelGraph<M>,
    lasso: &FairLasso<'_, M::Action>,
) -> Trace<M::State>
where
    M: FairModel,
    M::State: Clone,
{
    let mut trace = prefix_trace(model, graph, lasso.entry);
    trace.cycle = lasso
        .cycle
        .iter()
        .map(|edge| TraceStep {
            action: Some(model.action_label(&edge.action)),
            state: graph.state(edge.target).clone(),
        })
        .collect();
    trace.stutters = lasso.stutters;
    trace
}

struct Search<'m, M: FairModel> {
    model: &'m M,
    options: &'m ExploreOptions,
    invariants: Vec<Property<M>>,
    reachability: Vec<Property<M>>,
    exploration: Exploration<M>,
}

impl<'m, M> Search<'m, M>
where
    M: FairModel,
    M::State: Clone + Debug + Eq + Hash,
    M::Action: Clone,
{
    fn new(model: &'m M, options: &'m ExploreOptions) -> Self {
        let (invariants, reachability): (Vec<_>, Vec<_>) = model
            .properties()
            .into_iter()
            .filter(|property| !matches!(property.expectation, Expectation::Eventually))
            .partition(|property| matches!(property.expectation, Expectation::Always));
        let invariants = if options.properties.contains(PropertySelection::INVARIANTS) {
            invariants
        } else {
            Vec::new()
        };
        Self {
            model,
            options,
            invariants,
            reachability,
            exploration: Exploration {
                graph: ModelGraph::<M>::default(),
                stats: ExplorationStats::default(),
                cut: None,
                invariant_violation: None,
                reached: BTreeSet::new(),
                deepest: None,
            },
        }
    }

    fn run(mut self) -> Exploration<M> {
        let mut queue = VecDeque::new();
        for state in self.model.init_states() {
            let (node, fresh) = self.exploration.graph.add_initial(state);
            if fresh {
                if self.visit(node) {
                    return self.finish();
                }
                queue.push_back(node);
            }
        }

        while let Some(node) = queue.pop_front() {
            if self.expand(node, &mut queue) {
                return self.finish();
            }
        }

        self.exploration.stats.complete = self.exploration.cut.is_none();
        self.finish()
    }

    /// Expands `node`, queueing new successors. Returns `true` when an
    /// invariant failed.
    fn expand(&mut self, node: NodeId, queue: &mut VecDeque<NodeId>) -> bool {
        let state = self.exploration.graph.state(node).clone();
        let mut actions = Vec::new();
        self.model.actions(&state, &mut actions);

        let at_bound = self
            .options
            .max_depth
            .is_some_and(|bound| self.exploration.graph.depth(node) >= bound);
        let mut enabled = Vec::new();
        let mut complete = true;

        for action in actions {
            let Some(next) = self.model.next_state(&state, action.clone()) else {
                continue;
            };
            if next == state {
                self.exploration.stats.stuttering_steps += 1;
                continue;
            }
            if at_bound {
                if let Some(bound) = self.options.max_depth {
                    self.cut(InconclusiveReason::DepthBoundReached { max_depth: bound });
                }
                return false;
            }
            if let Some(class) = self.model.fairness(&action) {
                enabled.push(class);
            }
            let known = self.exploration.graph.lookup(&next).is_some();
            if !known && self.exploration.graph.len() >= self.options.max_states {
                complete = false;
                self.cut(InconclusiveReason::StateBudgetExceeded {
                    max_states: self.options.max_states,
                });
                continue;
            }
            let (target, fresh) = self.exploration.graph.add_successor(node, action, next);
            self.exploration.stats.transitions += 1;
            if fresh {
                if self.visit(target) {
                    return true;
                }
                queue.push_back(target);
            }
        }

        enabled.sort_unstable();
        enabled.dedup();
        if complete {
            self.exploration.stats.expanded += 1;
        }
        self.exploration.graph.finish(node, enabled, complete);
        false
    }

    /// Evaluates properties on a newly discovered node. Returns `true` when
    /// an invariant failed.
    fn visit(&mut self, node: NodeId) -> bool {
        let state = self.exploration.graph.state(node);
        let depth = self.exploration.graph.depth(node);
        let stats = &mut self.exploration.stats;
        stats.states += 1;
        stats.max_depth = stats.max_depth.max(depth);
        self.exploration.deepest = Some(node);
        if stats.states.is_multiple_of(PROGRESS_INTERVAL) {
            debug!(states = stats.states, depth, "exploration progress");
        }

        for property in &self.reachability {
            if (property.condition)(self.model, state) {
                self.exploration.reached.insert(property.name);
            }
        }

        let failed = self
            .invariants
            .iter()
            .find(|property| !(property.condition)(self.model, state))
            .map(|property| property.name);
        let Some(name) = failed else {
            return false;
        };
        self.exploration.invariant_violation = Some(Violation {
            property: name,
            kind: ViolationKind::Invariant,
            trace: prefix_trace(self.model, &self.exploration.graph, node),
        });
        true
    }

    fn cut(&mut self, reason: InconclusiveReason) {
        if self.exploration.cut.is_none() {
            warn!(%reason, "search cut short");
            self.exploration.cut = Some(reason);
        }
    }

    fn finish(self) -> Exploration<M> { self.exploration }
}
