//! Environment fault model.
//!
//! Faults are nondeterministic, never fair, and only touch live controllers.
//! Which kinds are enabled is selected with a [`FaultSet`]; the optional
//! per-behaviour budget lives on [`super::DualTorModel`].

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use serde::Serialize;

use super::{
    heartbeat::{HeartbeatInbox, HeartbeatSignal},
    state::{LinkState, Mux, SystemState, TorId, Xcvrd},
};
use crate::error::ConfigError;

bitflags! {
    /// Selection of fault kinds the environment may inject.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FaultSet: u8 {
        /// Lose pending heartbeats before a controller reads them.
        const FAIL_HEARTBEAT = 1 << 0;
        /// Corrupt the cable's active/next pair.
        const FAIL_MUX = 1 << 1;
        /// Crash a controller.
        const FAIL_TOR = 1 << 2;
        /// Make a transceiver driver give up on its request.
        const FAIL_XCVRD = 1 << 3;
        /// Take a controller's link down.
        const FAIL_LINK_STATE = 1 << 4;
    }
}

const FAULT_NAMES: [(&str, FaultSet); 5] = [
    ("fail-heartbeat", FaultSet::FAIL_HEARTBEAT),
    ("fail-mux", FaultSet::FAIL_MUX),
    ("fail-tor", FaultSet::FAIL_TOR),
    ("fail-xcvrd", FaultSet::FAIL_XCVRD),
    ("fail-link-state", FaultSet::FAIL_LINK_STATE),
];

impl FaultSet {
    /// Returns the configuration names of the selected kinds.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        FAULT_NAMES
            .iter()
            .filter(|(_, kind)| self.contains(*kind))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl FromStr for FaultSet {
    type Err = ConfigError;

    /// Parses `all`, `none`, or a comma-separated list of fault names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => return Ok(Self::all()),
            "none" | "" => return Ok(Self::empty()),
            _ => {}
        }
        value
            .split(',')
            .map(str::trim)
            .try_fold(Self::empty(), |selected, name| {
                FAULT_NAMES
                    .iter()
                    .find(|(known, _)| *known == name)
                    .map(|(_, kind)| selected | *kind)
                    .ok_or_else(|| ConfigError::UnknownValue {
                        key: "faults",
                        value: name.to_owned(),
                        expected: "all, none, or a list of fail-heartbeat, fail-mux, fail-tor, \
                                   fail-xcvrd, fail-link-state",
                    })
            })
    }
}

/// A concrete fault injection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(tag = "fault", rename_all = "kebab-case")]
pub enum Fault {
    /// Lose some of `tor`'s pending heartbeats.
    ///
    /// The heartbeat timer notices the gap, so the inbox becomes `keep` plus
    /// a no-response marker.
    FailHeartbeat {
        /// Controller losing heartbeats.
        tor: TorId,
        /// Heartbeats that survive, a strict subset of the pending ones.
        keep: HeartbeatInbox,
    },
    /// Overwrite the cable's direction registers.
    FailMux {
        /// New value of `mux.active`.
        active: TorId,
        /// New value of `mux.next`.
        next: TorId,
    },
    /// Crash `tor`.
    FailTor {
        /// Controller that crashes.
        tor: TorId,
    },
    /// `tor`'s transceiver driver abandons its request.
    FailXcvrd {
        /// Controller whose driver fails.
        tor: TorId,
    },
    /// `tor`'s link goes down.
    FailLinkState {
        /// Controller losing its link.
        tor: TorId,
    },
}

impl Fault {
    /// Returns the kind this fault belongs to.
    #[must_use]
    pub const fn kind(self) -> FaultSet {
        match self {
            Self::FailHeartbeat { .. } => FaultSet::FAIL_HEARTBEAT,
            Self::FailMux { .. } => FaultSet::FAIL_MUX,
            Self::FailTor { .. } => FaultSet::FAIL_TOR,
            Self::FailXcvrd { .. } => FaultSet::FAIL_XCVRD,
            Self::FailLinkState { .. } => FaultSet::FAIL_LINK_STATE,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailHeartbeat { tor, keep } => write!(f, "FailHeartbeat({tor}, keep={keep})"),
            Self::FailMux { active, next } => {
                write!(f, "FailMux(active={active}, next={next})")
            }
            Self::FailTor { tor } => write!(f, "FailTor({tor})"),
            Self::FailXcvrd { tor } => write!(f, "FailXcvrd({tor})"),
            Self::FailLinkState { tor } => write!(f, "FailLinkState({tor})"),
        }
    }
}

/// Appends every selected fault that would change `state`.
pub fn push_fault_actions(state: &SystemState, selected: FaultSet, faults: &mut Vec<Fault>) {
    for tor in state.tors().into_iter().filter(|tor| tor.alive) {
        if selected.contains(FaultSet::FAIL_HEARTBEAT) {
            faults.extend(
                tor.heartbeat_in
                    .heartbeats()
                    .strict_subsets()
                    .into_iter()
                    .map(|keep| Fault::FailHeartbeat {
                        tor: tor.name,
                        keep,
                    }),
            );
        }
        if selected.contains(FaultSet::FAIL_TOR) {
            faults.push(Fault::FailTor { tor: tor.name });
        }
        if selected.contains(FaultSet::FAIL_XCVRD) && tor.xcvrd != Xcvrd::Idle {
            faults.push(Fault::FailXcvrd { tor: tor.name });
        }
        if selected.contains(FaultSet::FAIL_LINK_STATE) && tor.is_link_up() {
            faults.push(Fault::FailLinkState { tor: tor.name });
        }
    }
    if selected.contains(FaultSet::FAIL_MUX) {
        push_mux_corruptions(&state.mux, faults);
    }
}

fn push_mux_corruptions(mux: &Mux, faults: &mut Vec<Fault>) {
    for active in TorId::ALL {
        for next in TorId::ALL {
            if (active, next) != (mux.active, mux.next) {
                faults.push(Fault::FailMux { active, next });
            }
        }
    }
}

/// Applies `fault` to `state` in place.
pub fn apply_fault(state: &mut SystemState, fault: Fault) {
    match fault {
        Fault::FailHeartbeat { tor, keep } => {
            state.tor_mut(tor).heartbeat_in = keep.with(HeartbeatSignal::NoResponse);
        }
        Fault::FailMux { active, next } => {
            state.mux.active = active;
            state.mux.next = next;
        }
        Fault::FailTor { tor } => state.tor_mut(tor).alive = false,
        Fault::FailXcvrd { tor } => state.tor_mut(tor).xcvrd = Xcvrd::Idle,
        Fault::FailLinkState { tor } => state.tor_mut(tor).link_state = LinkState::Down,
    }
}
