//! Verdicts, counterexample traces, and exploration statistics.

use serde::Serialize;

/// One step of a behaviour: the action taken and the state it produced.
///
/// The first step of a trace has no action; it carries the initial state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TraceStep<S> {
    /// Label of the action that produced `state`.
    pub action: Option<String>,
    /// Resulting state.
    pub state: S,
}

/// A finite behaviour, optionally closed into a lasso.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Trace<S> {
    /// Steps from an initial state.
    pub steps: Vec<TraceStep<S>>,
    /// Steps repeated forever after `steps`; they end where `steps` ends.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<TraceStep<S>>,
    /// `true` when the behaviour ends by stuttering in its last state forever.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stutters: bool,
}

impl<S> Trace<S> {
    /// Creates a finite trace.
    #[must_use]
    pub const fn finite(steps: Vec<TraceStep<S>>) -> Self {
        Self {
            steps,
            cycle: Vec::new(),
            stutters: false,
        }
    }

    /// Returns the number of transitions in the prefix.
    #[must_use]
    pub const fn depth(&self) -> usize { self.steps.len().saturating_sub(1) }

    /// Returns `true` when the trace describes an infinite behaviour.
    #[must_use]
    pub const fn is_lasso(&self) -> bool { !self.cycle.is_empty() || self.stutters }

    /// Returns the last state of the prefix.
    #[must_use]
    pub fn last_state(&self) -> Option<&S> { self.steps.last().map(|step| &step.state) }
}

/// Class of a violated property.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A state predicate failed in a reachable state.
    Invariant,
    /// A fair behaviour stays forever in a forbidden region.
    Safety,
    /// A fair behaviour stops making progress forever.
    Liveness,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Invariant => "invariant",
            Self::Safety => "safety",
            Self::Liveness => "liveness",
        })
    }
}

/// A violated property with its counterexample.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Violation<S> {
    /// Property name.
    pub property: &'static str,
    /// Property class.
    pub kind: ViolationKind,
    /// Counterexample.
    pub trace: Trace<S>,
}

/// Why a search stopped before covering the whole state space.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum InconclusiveReason {
    /// More states were reachable than the budget allows.
    StateBudgetExceeded {
        /// Configured budget.
        max_states: usize,
    },
    /// States at the depth bound were left unexpanded.
    DepthBoundReached {
        /// Configured bound.
        max_depth: usize,
    },
}

impl std::fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateBudgetExceeded { max_states } => {
                write!(f, "state budget of {max_states} states exceeded")
            }
            Self::DepthBoundReached { max_depth } => {
                write!(f, "depth bound of {max_depth} reached")
            }
        }
    }
}

/// Outcome of a check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "details", rename_all = "kebab-case")]
pub enum Verdict<S> {
    /// No violation exists within the explored behaviours.
    Verified,
    /// At least one selected property fails.
    Violated(Vec<Violation<S>>),
    /// The search was cut short and found no violation.
    Inconclusive(InconclusiveReason),
}

impl<S> Verdict<S> {
    /// Returns `true` for [`Verdict::Verified`].
    #[must_use]
    pub const fn is_verified(&self) -> bool { matches!(self, Self::Verified) }

    /// Returns the violations, empty unless the verdict is
    /// [`Verdict::Violated`].
    #[must_use]
    pub fn violations(&self) -> &[Violation<S>] {
        match self {
            Self::Violated(violations) => violations,
            Self::Verified | Self::Inconclusive(_) => &[],
        }
    }

    /// Returns the violation of the named property, if reported.
    #[must_use]
    pub fn violation(&self, property: &str) -> Option<&Violation<S>> {
        self.violations()
            .iter()
            .find(|violation| violation.property == property)
    }
}

/// Counters describing the explored graph.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ExplorationStats {
    /// Distinct states discovered.
    pub states: usize,
    /// States whose successors were all generated.
    pub expanded: usize,
    /// Non-stuttering transitions recorded.
    pub transitions: usize,
    /// Action firings that left the state unchanged.
    pub stuttering_steps: usize,
    /// Greatest BFS depth discovered.
    pub max_depth: usize,
    /// `true` when every reachable state was expanded.
    pub complete: bool,
}

/// Whether a reachability property was witnessed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Coverage {
    /// Property name.
    pub property: &'static str,
    /// `true` when some explored state satisfies it.
    pub reached: bool,
}

/// Full result of an exhaustive check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CheckReport<S> {
    /// Outcome.
    pub verdict: Verdict<S>,
    /// Graph statistics, partial when the verdict is inconclusive.
    pub stats: ExplorationStats,
    /// Reachability witnesses.
    pub coverage: Vec<Coverage>,
    /// Path to the deepest state explored, kept for inconclusive runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepest_trace: Option<Trace<S>>,
}
