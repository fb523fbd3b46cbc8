//! Action types and state transitions for the dual-ToR model.
//!
//! This module defines the protocol actions each controller and the cable can
//! take, the fairness class each belongs to, the enabling conditions, and the
//! pure transition function that computes the next state given an action.

use std::fmt;

use serde::Serialize;

use super::{
    WaitPolicy,
    faults::{Fault, apply_fault},
    heartbeat::{HeartbeatInbox, HeartbeatSignal},
    state::{Heartbeat, LinkProberState, LinkState, MuxState, SystemState, Tor, TorId, Xcvrd},
};

/// Actions that can be taken in the dual-ToR model.
///
/// Each action is one atomic step of a controller, the cable, or the
/// environment. The explorer branches on every enabled action.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Action {
    /// Claim the command channel and ask the cable for its direction.
    TriggerCheck {
        /// Controller issuing the check.
        tor: TorId,
    },
    /// The transceiver driver answers a check.
    AckCheck {
        /// Controller whose check completes.
        tor: TorId,
    },
    /// Claim the command channel and ask the cable to switch.
    TriggerSwitch {
        /// Controller issuing the switch.
        tor: TorId,
        /// Direction requested.
        target: TorId,
    },
    /// The transceiver driver accepts a switch; the cable schedules it.
    AckSwitch {
        /// Controller whose switch completes.
        tor: TorId,
    },
    /// Release the channel after the driver abandoned the request.
    AbortCommand {
        /// Controller giving up.
        tor: TorId,
    },
    /// Under the decay wait policy, forget the direction while waiting.
    DecayWait {
        /// Controller whose state machine decays.
        tor: TorId,
    },
    /// The cable performs a scheduled switch.
    ExecSwitch,
    /// The link prober consumes one pending heartbeat signal.
    ProbeLink {
        /// Controller consuming the signal.
        tor: TorId,
        /// Signal consumed.
        signal: HeartbeatSignal,
    },
    /// The active-side controller sends a heartbeat that the cable reflects
    /// to both controllers.
    SendHeartbeat {
        /// Sender.
        tor: TorId,
    },
    /// The heartbeat timer expires because the source is silent.
    HeartbeatTimeout {
        /// Controller whose timer fires.
        tor: TorId,
    },
    /// A down link comes up.
    LinkUp {
        /// Controller whose link recovers.
        tor: TorId,
    },
    /// The environment injects a fault.
    Fault(Fault),
}

impl Action {
    /// Returns the controller this action belongs to, if any.
    #[must_use]
    pub const fn tor(&self) -> Option<TorId> {
        match *self {
            Self::TriggerCheck { tor }
            | Self::AckCheck { tor }
            | Self::TriggerSwitch { tor, .. }
            | Self::AckSwitch { tor }
            | Self::AbortCommand { tor }
            | Self::DecayWait { tor }
            | Self::ProbeLink { tor, .. }
            | Self::SendHeartbeat { tor }
            | Self::HeartbeatTimeout { tor }
            | Self::LinkUp { tor } => Some(tor),
            Self::ExecSwitch | Self::Fault(_) => None,
        }
    }

    /// Returns the weakly fair class this action belongs to.
    ///
    /// Faults belong to no class.
    #[must_use]
    pub const fn fairness(&self) -> Option<FairnessClass> {
        match *self {
            Self::TriggerCheck { tor } | Self::TriggerSwitch { tor, .. } | Self::DecayWait { tor } => {
                Some(FairnessClass::MuxState(tor))
            }
            Self::AckCheck { tor } | Self::AckSwitch { tor } | Self::AbortCommand { tor } => {
                Some(FairnessClass::Xcvrd(tor))
            }
            Self::ProbeLink { tor, .. } => Some(FairnessClass::LinkProber(tor)),
            Self::SendHeartbeat { tor } => Some(FairnessClass::Heartbeat(tor)),
            Self::HeartbeatTimeout { tor } => Some(FairnessClass::ProbeTimer(tor)),
            Self::LinkUp { tor } => Some(FairnessClass::LinkState(tor)),
            Self::ExecSwitch => Some(FairnessClass::MuxExec),
            Self::Fault(_) => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TriggerCheck { tor } => write!(f, "TriggerCheck({tor})"),
            Self::AckCheck { tor } => write!(f, "AckCheck({tor}, {})", tor.other()),
            Self::TriggerSwitch { tor, target } => write!(f, "TriggerSwitch({tor}, {target})"),
            Self::AckSwitch { tor } => write!(f, "AckSwitch({tor}, {})", tor.other()),
            Self::AbortCommand { tor } => write!(f, "AbortCommand({tor})"),
            Self::DecayWait { tor } => write!(f, "DecayWait({tor})"),
            Self::ExecSwitch => f.write_str("ExecSwitch"),
            Self::ProbeLink { tor, signal } => write!(f, "LinkProber({tor}, {signal})"),
            Self::SendHeartbeat { tor } => write!(f, "SendHeartbeat({tor})"),
            Self::HeartbeatTimeout { tor } => write!(f, "HeartbeatTimeout({tor})"),
            Self::LinkUp { tor } => write!(f, "LinkUp({tor})"),
            Self::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

/// A group of actions treated as one weakly fair action.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum FairnessClass {
    /// The controller's MUX state machine (triggers and wait decay).
    MuxState(TorId),
    /// The controller's transceiver driver (acknowledgements and aborts).
    Xcvrd(TorId),
    /// The controller's link prober consuming heartbeats.
    LinkProber(TorId),
    /// The controller sending heartbeats.
    Heartbeat(TorId),
    /// The controller's heartbeat timer.
    ProbeTimer(TorId),
    /// The controller's link recovering.
    LinkState(TorId),
    /// The cable executing a scheduled switch.
    MuxExec,
}

impl FairnessClass {
    /// Every class, in the order a round-robin scheduler visits them.
    pub const ROUND_ROBIN: [Self; 13] = [
        Self::LinkState(TorId::A),
        Self::LinkProber(TorId::A),
        Self::Heartbeat(TorId::A),
        Self::ProbeTimer(TorId::A),
        Self::MuxState(TorId::A),
        Self::Xcvrd(TorId::A),
        Self::LinkState(TorId::B),
        Self::LinkProber(TorId::B),
        Self::Heartbeat(TorId::B),
        Self::ProbeTimer(TorId::B),
        Self::MuxState(TorId::B),
        Self::Xcvrd(TorId::B),
        Self::MuxExec,
    ];
}

impl fmt::Display for FairnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuxState(tor) => write!(f, "MuxState({tor})"),
            Self::Xcvrd(tor) => write!(f, "Xcvrd({tor})"),
            Self::LinkProber(tor) => write!(f, "LinkProber({tor})"),
            Self::Heartbeat(tor) => write!(f, "Heartbeat({tor})"),
            Self::ProbeTimer(tor) => write!(f, "ProbeTimer({tor})"),
            Self::LinkState(tor) => write!(f, "LinkState({tor})"),
            Self::MuxExec => f.write_str("MuxExec"),
        }
    }
}

/// What a controller's MUX state machine wants to do next.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MuxDecision {
    Check,
    Switch(TorId),
    Decay,
}

/// Decision table of the MUX state machine, keyed by
/// (`mux_state`, `link_state`, `link_prober`).
const fn mux_decision(tor: &Tor, policy: WaitPolicy) -> Option<MuxDecision> {
    use LinkProberState as Prober;

    match (tor.mux_state, tor.link_state, tor.link_prober) {
        (MuxState::Active, LinkState::Up, Prober::Standby | Prober::Unknown | Prober::Wait)
        | (MuxState::Standby, LinkState::Up, Prober::Active | Prober::Wait)
        | (MuxState::Standby | MuxState::Unknown, LinkState::Down, Prober::Unknown | Prober::Wait)
        | (MuxState::Unknown, LinkState::Up, _) => Some(MuxDecision::Check),
        (MuxState::Active, LinkState::Down, _) => Some(MuxDecision::Switch(tor.name.other())),
        (MuxState::Standby, LinkState::Up, Prober::Unknown) => Some(MuxDecision::Switch(tor.name)),
        (MuxState::Wait, _, _) => match policy {
            WaitPolicy::Recheck => Some(MuxDecision::Check),
            WaitPolicy::Decay => Some(MuxDecision::Decay),
        },
        _ => None,
    }
}

/// Appends every protocol action enabled in `state`.
///
/// Crashed controllers take no actions. Triggers require an idle command
/// channel, so once one controller claims it no other trigger is offered.
pub fn push_protocol_actions(state: &SystemState, policy: WaitPolicy, actions: &mut Vec<Action>) {
    for tor in state.tors().into_iter().filter(|tor| tor.alive) {
        push_mux_state_action(state, policy, tor, actions);
        push_xcvrd_action(state, tor, actions);
        push_link_actions(state, tor, actions);
    }
    if state.mux.is_idle() && state.mux.has_pending_switch() {
        actions.push(Action::ExecSwitch);
    }
}

fn push_mux_state_action(
    state: &SystemState,
    policy: WaitPolicy,
    tor: &Tor,
    actions: &mut Vec<Action>,
) {
    let idle = state.mux.is_idle();
    match mux_decision(tor, policy) {
        Some(MuxDecision::Check) if idle => actions.push(Action::TriggerCheck { tor: tor.name }),
        Some(MuxDecision::Switch(target)) if idle => actions.push(Action::TriggerSwitch {
            tor: tor.name,
            target,
        }),
        // A controller waiting on its own command keeps waiting.
        Some(MuxDecision::Decay) if state.mux.serving != Some(tor.name) => {
            actions.push(Action::DecayWait { tor: tor.name });
        }
        _ => {}
    }
}

fn push_xcvrd_action(state: &SystemState, tor: &Tor, actions: &mut Vec<Action>) {
    if state.mux.serving != Some(tor.name) {
        return;
    }
    match tor.xcvrd {
        Xcvrd::Check => actions.push(Action::AckCheck { tor: tor.name }),
        Xcvrd::Switch if tor.target.is_some() => actions.push(Action::AckSwitch { tor: tor.name }),
        Xcvrd::Idle => actions.push(Action::AbortCommand { tor: tor.name }),
        Xcvrd::Switch => {}
    }
}

fn push_link_actions(state: &SystemState, tor: &Tor, actions: &mut Vec<Action>) {
    if !tor.is_link_up() {
        actions.push(Action::LinkUp { tor: tor.name });
        return;
    }
    actions.extend(
        tor.heartbeat_in
            .signals()
            .map(|signal| Action::ProbeLink {
                tor: tor.name,
                signal,
            }),
    );
    if tor.heartbeat == Heartbeat::On && state.mux.active == tor.name {
        actions.push(Action::SendHeartbeat { tor: tor.name });
    }
    if tor.heartbeat_in.is_empty() && state.heartbeat_source_silent() {
        actions.push(Action::HeartbeatTimeout { tor: tor.name });
    }
}

/// Applies an action to a state, returning the resulting state.
///
/// This is a pure function: it does not modify the input state, and it does
/// not check enabledness. Callers pick actions from
/// [`push_protocol_actions`] or the fault model.
#[must_use]
pub fn apply_action(state: &SystemState, action: &Action) -> SystemState {
    let mut next = state.clone();

    match *action {
        Action::TriggerCheck { tor } => {
            let controller = next.tor_mut(tor);
            controller.mux_state = MuxState::Wait;
            controller.xcvrd = Xcvrd::Check;
            next.mux.serving = Some(tor);
        }
        Action::AckCheck { tor } => apply_ack_check(&mut next, tor),
        Action::TriggerSwitch { tor, target } => {
            let controller = next.tor_mut(tor);
            controller.mux_state = MuxState::Wait;
            controller.xcvrd = Xcvrd::Switch;
            controller.link_prober = LinkProberState::Wait;
            controller.target = Some(target);
            next.mux.serving = Some(tor);
        }
        Action::AckSwitch { tor } => apply_ack_switch(&mut next, tor),
        Action::AbortCommand { tor } => {
            next.tor_mut(tor).mux_state = MuxState::Standby;
            next.mux.serving = None;
        }
        Action::DecayWait { tor } => next.tor_mut(tor).mux_state = MuxState::Unknown,
        Action::ExecSwitch => next.mux.active = next.mux.next,
        Action::ProbeLink { tor, signal } => {
            let controller = next.tor_mut(tor);
            controller.heartbeat_in = controller.heartbeat_in.without(signal);
            controller.link_prober = match signal {
                HeartbeatSignal::From(sender) if sender == tor => LinkProberState::Active,
                HeartbeatSignal::From(_) => LinkProberState::Standby,
                HeartbeatSignal::NoResponse => LinkProberState::Unknown,
            };
        }
        Action::SendHeartbeat { tor } => {
            for id in TorId::ALL {
                let receiver = next.tor_mut(id);
                receiver.heartbeat_in = receiver.heartbeat_in.with(HeartbeatSignal::From(tor));
            }
        }
        Action::HeartbeatTimeout { tor } => {
            next.tor_mut(tor).heartbeat_in = HeartbeatInbox::NO_RESPONSE;
        }
        Action::LinkUp { tor } => next.tor_mut(tor).link_state = LinkState::Up,
        Action::Fault(fault) => apply_fault(&mut next, fault),
    }

    next
}

fn apply_ack_check(state: &mut SystemState, tor: TorId) {
    let pointed_here = state.mux.active == tor;
    let controller = state.tor_mut(tor);
    controller.mux_state = if pointed_here {
        MuxState::Active
    } else {
        MuxState::Standby
    };
    controller.xcvrd = Xcvrd::Idle;
    controller.heartbeat = Heartbeat::On;
    controller.target = None;
    state.mux.serving = None;
}

fn apply_ack_switch(state: &mut SystemState, tor: TorId) {
    let controller = state.tor_mut(tor);
    let target = controller.target;
    controller.mux_state = if target == Some(tor) {
        MuxState::Active
    } else {
        MuxState::Standby
    };
    controller.xcvrd = Xcvrd::Idle;
    controller.target = None;
    if let Some(direction) = target {
        state.mux.next = direction;
    }
    state.mux.serving = None;
}
