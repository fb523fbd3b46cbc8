//! Property definitions for the dual-ToR model.
//!
//! Properties are divided into:
//!
//! - **Invariants** ("always"): must hold in every reachable state.
//! - **Reachability properties** ("sometimes"): must hold in at least one
//!   reachable state. They guard against a model that is vacuously safe.
//! - **Temporal properties**: checked over fair infinite behaviours by
//!   [`crate::fairness`].
//!
//! [`moves_cable_only_on_command`] constrains steps rather than states and is
//! checked over the edges of an explored graph.

use stateright::Property;

use super::{
    DualTorModel,
    actions::Action,
    faults::Fault,
    state::{SystemState, TorId},
};
use crate::fairness::TemporalProperty;

/// Name of the type invariant.
pub const TYPE_OK_NAME: &str = "type ok";
/// Name of the command-channel exclusivity invariant.
pub const CHANNEL_EXCLUSIVE_NAME: &str = "mux command channel exclusive";
/// Name of the goal-active reachability property.
pub const CAN_REACH_GOAL_ACTIVE_NAME: &str = "can reach goal active";
/// Name of the pending-switch reachability property.
pub const CAN_SCHEDULE_SWITCH_NAME: &str = "can schedule mux switch";
/// Name of the crash reachability property.
pub const CAN_CRASH_A_TOR_NAME: &str = "can crash a tor";
/// Name of the split-brain safety property.
pub const NOT_FOREVER_BOTH_ACTIVE_NAME: &str = "not forever both active";
/// Name of the recovery liveness property.
pub const REPEATEDLY_ONE_ACTIVE_NAME: &str = "repeatedly one active";

/// Returns `true` when every field of `state` lies in its domain.
///
/// Enum fields are in range by construction; what remains is slot identity,
/// inbox contents, and the fault counter.
#[must_use]
pub fn is_well_typed(model: &DualTorModel, state: &SystemState) -> bool {
    let slots_match = TorId::ALL
        .into_iter()
        .all(|id| state.tor(id).name == id);
    let inboxes_valid = state
        .tors()
        .into_iter()
        .all(|tor| tor.heartbeat_in.is_well_formed());
    let budget_respected = model
        .max_faults
        .map_or(state.faults_injected == 0, |budget| {
            state.faults_injected <= budget
        });
    slots_match && inboxes_valid && budget_respected
}

/// Returns `true` when the channel holder, if any, names exactly one
/// controller.
#[must_use]
pub fn is_channel_exclusive(state: &SystemState) -> bool {
    state.mux.serving.is_none_or(|holder| {
        state
            .tors()
            .into_iter()
            .filter(|tor| tor.name == holder)
            .count()
            == 1
    })
}

/// Returns `true` when the step from `before` to `after` changes the cable
/// direction only by executing the scheduled switch or by corrupting it.
///
/// As a state predicate ("an active controller the cable does not point at
/// is the scheduled next hop") this fails without faults, since a controller
/// whose link went down keeps its `Active` state while the peer takes over.
#[must_use]
pub fn moves_cable_only_on_command(before: &SystemState, action: &Action, after: &SystemState) -> bool {
    match action {
        Action::ExecSwitch => after.mux.active == before.mux.next,
        Action::Fault(Fault::FailMux { .. }) => true,
        _ => after.mux.active == before.mux.active,
    }
}

/// Invariant: every state is well typed.
#[must_use]
pub fn type_ok() -> Property<DualTorModel> { Property::always(TYPE_OK_NAME, is_well_typed) }

/// Invariant: the MUX command channel is held by at most one controller.
#[must_use]
pub fn channel_exclusive() -> Property<DualTorModel> {
    Property::always(CHANNEL_EXCLUSIVE_NAME, |_model, state: &SystemState| {
        is_channel_exclusive(state)
    })
}

/// Reachability: some controller settles as the active side.
#[must_use]
pub fn can_reach_goal_active() -> Property<DualTorModel> {
    Property::sometimes(CAN_REACH_GOAL_ACTIVE_NAME, |_model, state: &SystemState| {
        state.tors().into_iter().any(|tor| tor.is_goal_active())
    })
}

/// Reachability: an acknowledged switch waits for the cable to execute it.
#[must_use]
pub fn can_schedule_switch() -> Property<DualTorModel> {
    Property::sometimes(CAN_SCHEDULE_SWITCH_NAME, |_model, state: &SystemState| {
        state.mux.has_pending_switch() && state.mux.is_idle()
    })
}

/// Reachability: the environment crashes a controller.
#[must_use]
pub fn can_crash_a_tor() -> Property<DualTorModel> {
    Property::sometimes(CAN_CRASH_A_TOR_NAME, |_model, state: &SystemState| {
        state.tors().into_iter().any(|tor| !tor.alive)
    })
}

/// Safety: no fair behaviour stays forever with both controllers settled as
/// active.
#[must_use]
pub fn not_forever_both_active() -> TemporalProperty<DualTorModel> {
    TemporalProperty::not_forever(NOT_FOREVER_BOTH_ACTIVE_NAME, |_model, state: &SystemState| {
        state.both_goal_active()
    })
}

/// Liveness: under weak fairness a live controller keeps settling as the
/// active side for as long as any controller is alive.
#[must_use]
pub fn repeatedly_one_active() -> TemporalProperty<DualTorModel> {
    TemporalProperty::infinitely_often(REPEATEDLY_ONE_ACTIVE_NAME, |_model, state: &SystemState| {
        state.has_active_or_all_crashed()
    })
}
