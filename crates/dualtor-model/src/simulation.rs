//! Random walks, scripted replay, and a weakly fair round-robin scheduler.
//!
//! Sampling trades completeness for reach: each walk follows one random
//! behaviour from an initial state and checks invariants along the way.
//! Seeds make every walk reproducible.

use std::{collections::HashSet, fmt::Debug, hash::Hash};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use stateright::{Expectation, Model};
use tracing::{debug, info};

use crate::{
    error::SimulationError,
    fairness::FairModel,
    verdict::{Coverage, Trace, TraceStep, Verdict, Violation, ViolationKind},
};

/// Parameters of a sampling run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SamplingPlan {
    /// Seed for the walk generator.
    pub seed: u64,
    /// Number of independent walks.
    pub walks: usize,
    /// Maximum number of steps per walk.
    pub walk_length: usize,
}

/// Result of a sampling run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SamplingReport<S> {
    /// Seed the run used; rerunning with it reproduces every walk.
    pub seed: u64,
    /// Walks completed.
    pub walks: usize,
    /// Steps taken across all walks.
    pub steps: usize,
    /// Distinct states visited.
    pub distinct_states: usize,
    /// `Violated` on the first invariant failure, otherwise `Verified`.
    pub verdict: Verdict<S>,
    /// Reachability witnesses seen on some walk.
    pub coverage: Vec<Coverage>,
    /// Selected temporal property classes random walks cannot evaluate.
    pub unchecked: Vec<&'static str>,
}

/// Follows random behaviours of `model`, checking invariants on every state.
///
/// A walk ends early when no non-stuttering action is enabled.
pub fn sample<M>(model: &M, plan: SamplingPlan, check_invariants: bool) -> SamplingReport<M::State>
where
    M: FairModel,
    M::State: Clone + Debug + Eq + Hash,
    M::Action: Clone,
{
    info!(
        seed = plan.seed,
        walks = plan.walks,
        walk_length = plan.walk_length,
        "starting random walks"
    );
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let properties = model.properties();
    let mut visited: HashSet<M::State> = HashSet::new();
    let mut reached = vec![false; properties.len()];
    let mut steps = 0;
    let mut walks = 0;
    let initial = model.init_states();

    let mut verdict = Verdict::Verified;
    'walks: for _ in 0..plan.walks {
        let Some(mut current) = initial.choose(&mut rng).cloned() else {
            break;
        };
        walks += 1;
        let mut trace = vec![TraceStep {
            action: None,
            state: current.clone(),
        }];

        loop {
            visited.insert(current.clone());
            for (property, seen) in properties.iter().zip(reached.iter_mut()) {
                let holds = (property.condition)(model, &current);
                match property.expectation {
                    Expectation::Sometimes if holds => *seen = true,
                    Expectation::Always if check_invariants && !holds => {
                        verdict = Verdict::Violated(vec![Violation {
                            property: property.name,
                            kind: ViolationKind::Invariant,
                            trace: Trace::finite(trace),
                        }]);
                        break 'walks;
                    }
                    _ => {}
                }
            }
            if trace.len() > plan.walk_length {
                break;
            }

            let Some((action, next)) = successors(model, &current).choose(&mut rng).cloned() else {
                debug!(depth = trace.len() - 1, "walk reached a dead end");
                break;
            };
            steps += 1;
            trace.push(TraceStep {
                action: Some(model.action_label(&action)),
                state: next.clone(),
            });
            current = next;
        }
    }

    let coverage = properties
        .iter()
        .zip(reached)
        .filter(|(property, _)| matches!(property.expectation, Expectation::Sometimes))
        .map(|(property, reached)| Coverage {
            property: property.name,
            reached,
        })
        .collect();

    info!(walks, steps, distinct_states = visited.len(), "random walks finished");
    SamplingReport {
        seed: plan.seed,
        walks,
        steps,
        distinct_states: visited.len(),
        verdict,
        coverage,
        unchecked: Vec::new(),
    }
}

/// Returns the non-stuttering successors of `state`.
fn successors<M>(model: &M, state: &M::State) -> Vec<(M::Action, M::State)>
where
    M: Model,
    M::State: PartialEq,
    M::Action: Clone,
{
    let mut actions = Vec::new();
    model.actions(state, &mut actions);
    actions
        .into_iter()
        .filter_map(|action| {
            let next = model.next_state(state, action.clone())?;
            (next != *state).then_some((action, next))
        })
        .collect()
}

/// Visits fairness classes in a fixed cyclic order, picking the next one
/// that is enabled.
///
/// Every class enabled continuously is picked within one round, so runs
/// driven by this scheduler are weakly fair.
#[derive(Clone, Debug)]
pub struct RoundRobin<F> {
    order: Vec<F>,
    cursor: usize,
}

impl<F: Copy + Eq> RoundRobin<F> {
    /// Creates a scheduler visiting `order` cyclically.
    #[must_use]
    pub const fn new(order: Vec<F>) -> Self { Self { order, cursor: 0 } }

    /// Picks the first candidate whose class comes next in the rotation.
    fn pick<'c, T>(&mut self, candidates: &'c [(F, T)]) -> Option<&'c T> {
        let (position, class) = self
            .order
            .iter()
            .copied()
            .enumerate()
            .cycle()
            .skip(self.cursor)
            .take(self.order.len())
            .find(|(_, class)| candidates.iter().any(|(enabled, _)| enabled == class))?;
        self.cursor = position + 1;
        candidates
            .iter()
            .find(|(enabled, _)| *enabled == class)
            .map(|(_, candidate)| candidate)
    }
}

/// A behaviour driven step by step from one starting state.
pub struct Simulation<'m, M: Model> {
    model: &'m M,
    state: M::State,
    steps: Vec<TraceStep<M::State>>,
}

impl<'m, M> Simulation<'m, M>
where
    M: FairModel,
    M::State: Clone + PartialEq,
    M::Action: Clone + PartialEq,
{
    /// Starts a simulation at `state`.
    #[must_use]
    pub fn new(model: &'m M, state: M::State) -> Self {
        Self {
            model,
            steps: vec![TraceStep {
                action: None,
                state: state.clone(),
            }],
            state,
        }
    }

    /// Starts a simulation at the model's first initial state.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::NoInitialState`] if the model has none.
    pub fn from_initial(model: &'m M) -> Result<Self, SimulationError> {
        let state = model
            .init_states()
            .into_iter()
            .next()
            .ok_or(SimulationError::NoInitialState)?;
        Ok(Self::new(model, state))
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &M::State { &self.state }

    /// Returns the number of steps taken.
    #[must_use]
    pub fn len(&self) -> usize { self.steps.len().saturating_sub(1) }

    /// Returns `true` before the first step.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Takes `action` if it is enabled and changes the state.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::ActionNotEnabled`] when the model does not
    /// offer `action` here, or when firing it would only stutter.
    pub fn step(&mut self, action: M::Action) -> Result<&M::State, SimulationError> {
        let current = self.state().clone();
        let next = self.successor(&current, &action).ok_or_else(|| {
            SimulationError::ActionNotEnabled {
                step: self.len(),
                action: self.model.action_label(&action),
            }
        })?;
        self.push(&action, next);
        Ok(self.state())
    }

    /// Takes every action of `script` in order.
    ///
    /// # Errors
    ///
    /// Stops at the first action that is not enabled.
    pub fn replay(
        &mut self,
        script: impl IntoIterator<Item = M::Action>,
    ) -> Result<&M::State, SimulationError> {
        for action in script {
            self.step(action)?;
        }
        Ok(self.state())
    }

    /// Runs fair actions chosen by `scheduler` until `goal` holds.
    ///
    /// Faults and other unfair actions are never chosen. Returns the number
    /// of steps taken by this call.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::StepLimitReached`] if `goal` still fails
    /// after `max_steps`, or [`SimulationError::Quiescent`] when no fair
    /// action is enabled.
    pub fn run_fair_until(
        &mut self,
        scheduler: &mut RoundRobin<M::Fairness>,
        goal: impl Fn(&M::State) -> bool,
        max_steps: usize,
    ) -> Result<usize, SimulationError> {
        for taken in 0..=max_steps {
            let current = self.state().clone();
            if goal(&current) {
                return Ok(taken);
            }
            if taken == max_steps {
                break;
            }
            let mut actions = Vec::new();
            self.model.actions(&current, &mut actions);
            let candidates: Vec<(M::Fairness, (M::Action, M::State))> = actions
                .into_iter()
                .filter_map(|action| {
                    let class = self.model.fairness(&action)?;
                    let next = self.successor(&current, &action)?;
                    Some((class, (action, next)))
                })
                .collect();
            let Some((action, next)) = scheduler.pick(&candidates).cloned() else {
                return Err(SimulationError::Quiescent { steps: self.len() });
            };
            self.push(&action, next);
        }
        Err(SimulationError::StepLimitReached { max_steps })
    }

    /// Returns the behaviour so far.
    #[must_use]
    pub fn into_trace(self) -> Trace<M::State> { Trace::finite(self.steps) }

    fn successor(&self, state: &M::State, action: &M::Action) -> Option<M::State> {
        let mut actions = Vec::new();
        self.model.actions(state, &mut actions);
        if !actions.contains(action) {
            return None;
        }
        self.model
            .next_state(state, action.clone())
            .filter(|next| next != state)
    }

    fn push(&mut self, action: &M::Action, state: M::State) {
        self.steps.push(TraceStep {
            action: Some(self.model.action_label(action)),
            state: state.clone(),
        });
        self.state = state;
    }
}
