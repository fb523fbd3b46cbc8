//! Parallel invariant and reachability sweep on the stateright checker.
//!
//! The sweep hands the model to stateright's multi-threaded breadth-first
//! checker. It evaluates the model's "always" and "sometimes" properties only;
//! temporal properties need the explicit graph of [`crate::explorer`].

use std::collections::BTreeSet;

use serde::Serialize;
use stateright::{Checker, Expectation, Model};
use tracing::info;

use crate::tor_model::DualTorModel;

/// Limits for a stateright sweep.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SweepPlan {
    /// Worker threads.
    pub threads: usize,
    /// State budget handed to the checker.
    pub max_states: usize,
    /// States deeper than this are not expanded.
    pub max_depth: Option<usize>,
}

/// Result of a stateright sweep.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SweepReport {
    /// Worker threads used.
    pub threads: usize,
    /// Distinct states visited.
    pub unique_states: usize,
    /// State budget handed to the checker.
    pub max_states: usize,
    /// Depth bound handed to the checker.
    pub max_depth: Option<usize>,
    /// `true` when the checker exhausted the state space.
    pub complete: bool,
    /// Invariants with a counterexample.
    pub violated: Vec<&'static str>,
    /// Reachability properties witnessed.
    pub reached: Vec<&'static str>,
    /// Reachability properties not witnessed.
    pub unreached: Vec<&'static str>,
    /// Selected temporal property classes a sweep cannot evaluate.
    pub unchecked: Vec<&'static str>,
}

/// Runs stateright's breadth-first checker over `model` within `plan`.
///
/// A depth-bounded sweep never counts as complete, since the checker does not
/// say whether the bound cut anything off.
#[must_use]
pub fn sweep(model: DualTorModel, plan: SweepPlan) -> SweepReport {
    info!(
        threads = plan.threads,
        max_states = plan.max_states,
        max_depth = ?plan.max_depth,
        "starting stateright sweep"
    );
    let properties = model.properties();
    let mut builder = model
        .checker()
        .threads(plan.threads)
        .target_state_count(plan.max_states);
    if let Some(depth) = plan.max_depth {
        builder = builder.target_max_depth(depth);
    }
    let checker = builder.spawn_bfs().join();
    let discovered: BTreeSet<&'static str> = checker.discoveries().keys().copied().collect();

    let mut report = SweepReport {
        threads: plan.threads,
        unique_states: checker.unique_state_count(),
        max_states: plan.max_states,
        max_depth: plan.max_depth,
        complete: checker.unique_state_count() < plan.max_states && plan.max_depth.is_none(),
        violated: Vec::new(),
        reached: Vec::new(),
        unreached: Vec::new(),
        unchecked: Vec::new(),
    };
    for property in &properties {
        let found = discovered.contains(property.name);
        match property.expectation {
            Expectation::Always | Expectation::Eventually if found => {
                report.violated.push(property.name);
            }
            Expectation::Sometimes if found => report.reached.push(property.name),
            Expectation::Sometimes => report.unreached.push(property.name),
            Expectation::Always | Expectation::Eventually => {}
        }
    }
    info!(
        unique_states = report.unique_states,
        violated = report.violated.len(),
        "stateright sweep finished"
    );
    report
}
