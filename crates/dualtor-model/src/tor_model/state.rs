//! State types for the dual-ToR failover model.
//!
//! This module defines the values the explorer enumerates:
//! - [`TorId`]: identity of one of the two ToR controllers
//! - [`Tor`]: per-controller protocol state
//! - [`Mux`]: the shared cable and its exclusive command channel
//! - [`SystemState`]: the whole system as one immutable snapshot

use std::{fmt, str::FromStr};

use serde::Serialize;

use super::heartbeat::HeartbeatInbox;
use crate::error::ConfigError;

/// Identity of a ToR controller.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TorId {
    /// The first controller, `torA`.
    A,
    /// The second controller, `torB`.
    B,
}

impl TorId {
    /// Both identities in slot order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    /// Returns the peer controller.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Returns the display name used in traces.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "torA",
            Self::B => "torB",
        }
    }
}

impl fmt::Display for TorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for TorId {
    type Err = ConfigError;

    /// Accepts `a`, `b`, or a trace label such as `torA`, in any case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" | "tora" => Ok(Self::A),
            "b" | "torb" => Ok(Self::B),
            _ => Err(ConfigError::UnknownValue {
                key: "tor",
                value: value.to_owned(),
                expected: "torA or torB",
            }),
        }
    }
}

/// Transceiver-driver status.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Xcvrd {
    /// A switch request is outstanding.
    Switch,
    /// A direction check is outstanding.
    Check,
    /// No request is outstanding.
    Idle,
}

/// Whether a ToR emits heartbeats.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Heartbeat {
    /// Heartbeats are emitted while the link is up.
    On,
    /// Heartbeats are suppressed.
    Off,
}

/// A ToR's belief about its own role, inferred from heartbeat origin.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum LinkProberState {
    /// Own heartbeats come back through the MUX.
    Active,
    /// The peer's heartbeats come back through the MUX.
    Standby,
    /// Waiting for the first observation after a switch.
    Wait,
    /// Heartbeats stopped arriving.
    Unknown,
}

/// Physical link status between a ToR and the MUX cable.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum LinkState {
    /// The link carries traffic.
    Up,
    /// The link is down.
    Down,
}

/// The role a ToR's MUX state machine believes it holds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum MuxState {
    /// The cable points at this ToR.
    Active,
    /// The cable points at the peer.
    Standby,
    /// A command is in flight.
    Wait,
    /// The direction is not known.
    Unknown,
}

/// Protocol state of one ToR controller.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Tor {
    /// `false` once the controller has crashed. Crashes are absorbing.
    pub alive: bool,
    /// Identity of the controller.
    pub name: TorId,
    /// Transceiver-driver status.
    pub xcvrd: Xcvrd,
    /// Whether heartbeats are emitted.
    pub heartbeat: Heartbeat,
    /// Pending inbound heartbeat signals.
    pub heartbeat_in: HeartbeatInbox,
    /// Role belief inferred from heartbeats.
    pub link_prober: LinkProberState,
    /// Physical link status.
    pub link_state: LinkState,
    /// Role held by the MUX state machine.
    pub mux_state: MuxState,
    /// Direction this ToR asked the MUX to switch to.
    pub target: Option<TorId>,
}

impl Tor {
    /// Creates a freshly booted controller.
    #[must_use]
    pub const fn new(name: TorId) -> Self {
        Self {
            alive: true,
            name,
            xcvrd: Xcvrd::Check,
            heartbeat: Heartbeat::On,
            heartbeat_in: HeartbeatInbox::empty(),
            link_prober: LinkProberState::Wait,
            link_state: LinkState::Down,
            mux_state: MuxState::Wait,
            target: None,
        }
    }

    /// Returns `true` when the link is up.
    #[must_use]
    pub const fn is_link_up(&self) -> bool { matches!(self.link_state, LinkState::Up) }

    /// Returns `true` when the controller puts heartbeats on the wire.
    #[must_use]
    pub const fn emits_heartbeats(&self) -> bool {
        self.alive && self.is_link_up() && matches!(self.heartbeat, Heartbeat::On)
    }

    /// Returns `true` when the controller is settled as the active side.
    ///
    /// Every local component must agree: the driver is idle, heartbeats are
    /// on and observed as our own, the link is up, the MUX state machine is
    /// active, and no switch is pending.
    #[must_use]
    pub const fn is_goal_active(&self) -> bool {
        self.alive
            && matches!(self.xcvrd, Xcvrd::Idle)
            && matches!(self.heartbeat, Heartbeat::On)
            && matches!(self.link_prober, LinkProberState::Active)
            && self.is_link_up()
            && matches!(self.mux_state, MuxState::Active)
            && self.target.is_none()
    }
}

impl fmt::Display for Tor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.target.map_or("-", TorId::label);
        write!(
            f,
            "{}[{} mux={:?} prober={:?} link={:?} xcvrd={:?} hb={:?} in={} target={}]",
            self.name,
            if self.alive { "alive" } else { "dead" },
            self.mux_state,
            self.link_prober,
            self.link_state,
            self.xcvrd,
            self.heartbeat,
            self.heartbeat_in,
            target,
        )
    }
}

/// The shared MUX cable.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Mux {
    /// Controller the cable currently points at.
    pub active: TorId,
    /// Controller the cable will point at once a pending switch executes.
    pub next: TorId,
    /// Controller holding the exclusive command channel.
    pub serving: Option<TorId>,
}

impl Mux {
    /// Creates an idle cable pointing at `active`.
    #[must_use]
    pub const fn pointing_at(active: TorId) -> Self {
        Self {
            active,
            next: active,
            serving: None,
        }
    }

    /// Returns `true` when nobody holds the command channel.
    #[must_use]
    pub const fn is_idle(&self) -> bool { self.serving.is_none() }

    /// Returns `true` when an acknowledged switch has not executed yet.
    #[must_use]
    pub fn has_pending_switch(&self) -> bool { self.active != self.next }
}

impl fmt::Display for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let serving = self.serving.map_or("-", TorId::label);
        write!(
            f,
            "mux[active={} next={} serving={}]",
            self.active, self.next, serving
        )
    }
}

/// Global state: both controllers, the cable, and the fault counter.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct SystemState {
    /// Controller in slot A.
    pub tor_a: Tor,
    /// Controller in slot B.
    pub tor_b: Tor,
    /// The shared cable.
    pub mux: Mux,
    /// Faults injected so far. Only advances under a fault budget.
    pub faults_injected: u8,
}

impl SystemState {
    /// Creates the initial state with the cable pointing at `initial_active`.
    #[must_use]
    pub const fn new(initial_active: TorId) -> Self {
        Self {
            tor_a: Tor::new(TorId::A),
            tor_b: Tor::new(TorId::B),
            mux: Mux::pointing_at(initial_active),
            faults_injected: 0,
        }
    }

    /// Returns the controller in the slot named by `id`.
    #[must_use]
    pub const fn tor(&self, id: TorId) -> &Tor {
        match id {
            TorId::A => &self.tor_a,
            TorId::B => &self.tor_b,
        }
    }

    /// Returns the controller in the slot named by `id` for mutation.
    pub const fn tor_mut(&mut self, id: TorId) -> &mut Tor {
        match id {
            TorId::A => &mut self.tor_a,
            TorId::B => &mut self.tor_b,
        }
    }

    /// Returns both controllers in slot order.
    #[must_use]
    pub const fn tors(&self) -> [&Tor; 2] { [&self.tor_a, &self.tor_b] }

    /// Returns `true` when the controller the cable points at is not
    /// emitting heartbeats, so nothing can arrive at either inbox.
    #[must_use]
    pub const fn heartbeat_source_silent(&self) -> bool {
        !self.tor(self.mux.active).emits_heartbeats()
    }

    /// Returns `true` when at least one controller is alive.
    #[must_use]
    pub const fn any_alive(&self) -> bool { self.tor_a.alive || self.tor_b.alive }

    /// Returns `true` when both controllers are in the goal-active shape.
    #[must_use]
    pub const fn both_goal_active(&self) -> bool {
        self.tor_a.is_goal_active() && self.tor_b.is_goal_active()
    }

    /// Returns `true` when some controller is goal-active or none is alive.
    ///
    /// This is the condition the liveness property expects to recur.
    #[must_use]
    pub const fn has_active_or_all_crashed(&self) -> bool {
        !self.any_alive() || self.tor_a.is_goal_active() || self.tor_b.is_goal_active()
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.tor_a, self.tor_b, self.mux)?;
        if self.faults_injected > 0 {
            write!(f, " faults={}", self.faults_injected)?;
        }
        Ok(())
    }
}
