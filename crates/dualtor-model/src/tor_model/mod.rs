//! Model of the dual-ToR MUX failover protocol.
//!
//! Two redundant controllers share one MUX cable that forwards traffic to
//! only one of them. This module explores every interleaving of their
//! protocol actions together with injected environment faults. The model
//! checks that:
//!
//! 1. **Safety**: the command channel is exclusive and every state is well
//!    typed.
//! 2. **No split brain**: no fair behaviour keeps both controllers settled
//!    as active forever.
//! 3. **Recovery**: under weak fairness, while a controller is alive one of
//!    the live controllers keeps becoming the settled active side.
//!
//! # Example
//!
//! ```
//! use dualtor_model::tor_model::DualTorModel;
//! use stateright::{Checker, Model};
//!
//! let model = DualTorModel::fault_free();
//! let checker = model.checker().target_state_count(200).spawn_bfs().join();
//! assert!(checker.unique_state_count() > 0);
//! ```
//!
//! # Model configuration
//!
//! The model is parameterized by:
//! - `faults`: which fault kinds the environment may inject (default: all)
//! - `max_faults`: optional number of faults one behaviour may inject
//! - `wait_policy`: how a controller stuck in `Wait` makes progress
//! - `initial_active`: the directions the cable may point at on boot

pub mod actions;
pub mod faults;
pub mod heartbeat;
pub mod properties;
pub mod state;

use std::{fmt, str::FromStr};

use serde::Serialize;
use stateright::{Model, Property};

use self::{
    actions::{Action, FairnessClass, apply_action, push_protocol_actions},
    faults::{FaultSet, push_fault_actions},
    properties::{
        can_crash_a_tor,
        can_reach_goal_active,
        can_schedule_switch,
        channel_exclusive,
        not_forever_both_active,
        repeatedly_one_active,
        type_ok,
    },
    state::{SystemState, TorId},
};
use crate::{
    error::ConfigError,
    fairness::{FairModel, TemporalProperty},
};

/// How a controller whose MUX state machine sits in `Wait` makes progress.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitPolicy {
    /// Re-issue a direction check.
    #[default]
    Recheck,
    /// Decay to `Unknown` without touching the command channel.
    Decay,
}

impl FromStr for WaitPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "recheck" => Ok(Self::Recheck),
            "decay" => Ok(Self::Decay),
            other => Err(ConfigError::UnknownValue {
                key: "wait_policy",
                value: other.to_owned(),
                expected: "recheck or decay",
            }),
        }
    }
}

impl fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recheck => "recheck",
            Self::Decay => "decay",
        })
    }
}

/// Configuration for the dual-ToR verification model.
///
/// Use [`DualTorModel::default()`] for the full fault model, or
/// [`DualTorModel::fault_free()`] to explore the protocol alone.
#[derive(Clone, Debug)]
pub struct DualTorModel {
    /// Fault kinds the environment may inject.
    pub faults: FaultSet,
    /// Maximum number of faults per behaviour; `None` means unbounded.
    pub max_faults: Option<u8>,
    /// Progress rule for controllers in `Wait`.
    pub wait_policy: WaitPolicy,
    /// Directions the cable may point at initially; one initial state each.
    pub initial_active: Vec<TorId>,
}

impl Default for DualTorModel {
    fn default() -> Self {
        Self {
            faults: FaultSet::all(),
            max_faults: None,
            wait_policy: WaitPolicy::default(),
            initial_active: TorId::ALL.to_vec(),
        }
    }
}

impl DualTorModel {
    /// Creates a model without environment faults.
    #[must_use]
    pub fn fault_free() -> Self { Self::with_faults(FaultSet::empty()) }

    /// Creates a model injecting only the selected fault kinds.
    #[must_use]
    pub fn with_faults(faults: FaultSet) -> Self {
        Self {
            faults,
            ..Default::default()
        }
    }

    /// Returns `true` while `state` may still receive a fault.
    #[must_use]
    pub fn fault_budget_remaining(&self, state: &SystemState) -> bool {
        self.max_faults
            .is_none_or(|budget| state.faults_injected < budget)
    }

    /// Returns the actions enabled in `state`, protocol actions first.
    #[must_use]
    pub fn enabled_actions(&self, state: &SystemState) -> Vec<Action> {
        let mut actions = Vec::new();
        self.actions(state, &mut actions);
        actions
    }

    fn push_fault_actions(&self, state: &SystemState, actions: &mut Vec<Action>) {
        if self.faults.is_empty() || !self.fault_budget_remaining(state) {
            return;
        }
        let mut faults = Vec::new();
        push_fault_actions(state, self.faults, &mut faults);
        actions.extend(faults.into_iter().map(Action::Fault));
    }
}

impl Model for DualTorModel {
    type State = SystemState;
    type Action = Action;

    fn init_states(&self) -> Vec<Self::State> {
        self.initial_active
            .iter()
            .copied()
            .map(SystemState::new)
            .collect()
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        push_protocol_actions(state, self.wait_policy, actions);
        self.push_fault_actions(state, actions);
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut next = apply_action(state, &action);
        // Without a budget the counter stays at zero to keep the space finite.
        if matches!(action, Action::Fault(_)) && self.max_faults.is_some() {
            next.faults_injected = next.faults_injected.saturating_add(1);
        }
        Some(next)
    }

    fn properties(&self) -> Vec<Property<Self>> {
        vec![
            // Invariants
            type_ok(),
            channel_exclusive(),
            // Reachability properties
            can_reach_goal_active(),
            can_schedule_switch(),
            can_crash_a_tor(),
        ]
    }
}

impl FairModel for DualTorModel {
    type Fairness = FairnessClass;

    fn fairness(&self, action: &Self::Action) -> Option<Self::Fairness> { action.fairness() }

    fn action_label(&self, action: &Self::Action) -> String { action.to_string() }

    fn temporal_properties(&self) -> Vec<TemporalProperty<Self>> {
        vec![not_forever_both_active(), repeatedly_one_active()]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rstest::rstest;
    use stateright::{Checker, HasDiscoveries};

    use super::*;
    use crate::tor_model::{
        faults::Fault,
        properties::{CAN_REACH_GOAL_ACTIVE_NAME, CAN_SCHEDULE_SWITCH_NAME},
    };

    const TARGET_MAX_DEPTH: usize = 14;
    const TARGET_STATE_COUNT: usize = 20_000;

    fn reachability_property_names() -> BTreeSet<&'static str> {
        [CAN_REACH_GOAL_ACTIVE_NAME, CAN_SCHEDULE_SWITCH_NAME]
            .into_iter()
            .collect()
    }

    #[test]
    fn default_model_injects_every_fault_kind() {
        let model = DualTorModel::default();
        assert_eq!(model.faults, FaultSet::all());
        assert_eq!(model.max_faults, None);
        assert_eq!(model.wait_policy, WaitPolicy::Recheck);
        assert_eq!(model.initial_active, vec![TorId::A, TorId::B]);
    }

    #[test]
    fn init_states_follow_initial_directions() {
        let model = DualTorModel {
            initial_active: vec![TorId::B],
            ..DualTorModel::fault_free()
        };
        let states = model.init_states();
        assert_eq!(states.len(), 1);
        let state = states.first().expect("state exists");
        assert_eq!(state.mux.active, TorId::B);
    }

    #[test]
    fn initial_state_offers_link_up_and_checks() {
        let model = DualTorModel::fault_free();
        let actions = model.enabled_actions(&SystemState::new(TorId::A));

        assert!(actions.contains(&Action::LinkUp { tor: TorId::A }));
        assert!(actions.contains(&Action::LinkUp { tor: TorId::B }));
        assert!(actions.contains(&Action::TriggerCheck { tor: TorId::A }));
        assert!(!actions.iter().any(|a| matches!(a, Action::Fault(_))));
        assert!(!actions.contains(&Action::ExecSwitch));
    }

    #[rstest]
    #[case(None, 0)]
    #[case(Some(2), 1)]
    fn faults_advance_counter_only_under_budget(
        #[case] max_faults: Option<u8>,
        #[case] expected: u8,
    ) {
        let model = DualTorModel {
            max_faults,
            ..DualTorModel::default()
        };
        let state = SystemState::new(TorId::A);
        let next = model
            .next_state(&state, Action::Fault(Fault::FailTor { tor: TorId::A }))
            .expect("transition exists");
        assert_eq!(next.faults_injected, expected);
    }

    #[test]
    fn spent_budget_disables_faults() {
        let model = DualTorModel {
            max_faults: Some(1),
            ..DualTorModel::default()
        };
        let mut state = SystemState::new(TorId::A);
        state.faults_injected = 1;
        let actions = model.enabled_actions(&state);
        assert!(!actions.iter().any(|a| matches!(a, Action::Fault(_))));
    }

    #[test]
    fn decay_policy_replaces_wait_recheck() {
        let model = DualTorModel {
            wait_policy: WaitPolicy::Decay,
            ..DualTorModel::fault_free()
        };
        let actions = model.enabled_actions(&SystemState::new(TorId::A));
        assert!(actions.contains(&Action::DecayWait { tor: TorId::A }));
        assert!(!actions.contains(&Action::TriggerCheck { tor: TorId::A }));
    }

    #[rstest]
    #[case("recheck", WaitPolicy::Recheck)]
    #[case(" decay ", WaitPolicy::Decay)]
    fn parses_wait_policies(#[case] input: &str, #[case] expected: WaitPolicy) {
        assert_eq!(input.parse::<WaitPolicy>().expect("valid policy"), expected);
    }

    #[test]
    fn rejects_unknown_wait_policy() {
        assert!("linger".parse::<WaitPolicy>().is_err());
    }

    #[test]
    fn properties_include_invariants_and_reachability() {
        let model = DualTorModel::default();
        let props = model.properties();
        assert_eq!(props.len(), 5);
        assert!(props.iter().any(|p| p.name.contains("exclusive")));
        assert_eq!(model.temporal_properties().len(), 2);
    }

    #[test]
    fn fault_free_model_reaches_goal_active_and_pending_switch() {
        let checker = DualTorModel::fault_free()
            .checker()
            .target_max_depth(TARGET_MAX_DEPTH)
            .target_state_count(TARGET_STATE_COUNT)
            .finish_when(HasDiscoveries::AllOf(reachability_property_names()))
            .spawn_bfs()
            .join();
        let discovered: BTreeSet<&'static str> = checker.discoveries().keys().copied().collect();
        assert!(discovered.contains(CAN_REACH_GOAL_ACTIVE_NAME));
        assert!(discovered.contains(CAN_SCHEDULE_SWITCH_NAME));
    }
}
