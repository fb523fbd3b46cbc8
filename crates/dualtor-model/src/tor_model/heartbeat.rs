//! Heartbeat signals and the per-ToR inbox of pending signals.
//!
//! A ToR learns its role from whose heartbeat the MUX reflects back to it.
//! Signals can arrive out of order and several may be pending at once, so
//! the inbox is a set rather than a queue. The three possible members fit in
//! a bitflag set, which keeps [`super::state::SystemState`] small and cheap
//! to hash.

use bitflags::bitflags;
use serde::{Serialize, Serializer};

use super::state::TorId;

bitflags! {
    /// Set of pending inbound heartbeat signals for one ToR.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HeartbeatInbox: u8 {
        /// A heartbeat originating from torA.
        const FROM_A = 1 << 0;
        /// A heartbeat originating from torB.
        const FROM_B = 1 << 1;
        /// The heartbeat timer expired without any reply.
        const NO_RESPONSE = 1 << 2;
    }
}

/// One inbound heartbeat observation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeartbeatSignal {
    /// A heartbeat sent by the named ToR and reflected by the MUX.
    From(TorId),
    /// The heartbeat timer expired.
    NoResponse,
}

impl HeartbeatSignal {
    /// Every signal a ToR can observe, in inbox bit order.
    pub const ALL: [Self; 3] = [Self::From(TorId::A), Self::From(TorId::B), Self::NoResponse];

    /// Returns the inbox bit representing this signal.
    #[must_use]
    pub const fn flag(self) -> HeartbeatInbox {
        match self {
            Self::From(TorId::A) => HeartbeatInbox::FROM_A,
            Self::From(TorId::B) => HeartbeatInbox::FROM_B,
            Self::NoResponse => HeartbeatInbox::NO_RESPONSE,
        }
    }
}

impl std::fmt::Display for HeartbeatSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::From(tor) => write!(f, "{tor}"),
            Self::NoResponse => f.write_str("no-response"),
        }
    }
}

impl HeartbeatInbox {
    /// Returns a copy of the inbox with `signal` added.
    #[must_use]
    pub const fn with(self, signal: HeartbeatSignal) -> Self { self.union(signal.flag()) }

    /// Returns a copy of the inbox with `signal` consumed.
    #[must_use]
    pub const fn without(self, signal: HeartbeatSignal) -> Self {
        self.difference(signal.flag())
    }

    /// Returns `true` if `signal` is pending.
    #[must_use]
    pub const fn holds(self, signal: HeartbeatSignal) -> bool { self.contains(signal.flag()) }

    /// Iterates over the pending signals in a stable order.
    pub fn signals(self) -> impl Iterator<Item = HeartbeatSignal> {
        HeartbeatSignal::ALL
            .into_iter()
            .filter(move |signal| self.holds(*signal))
    }

    /// Returns only the reflected heartbeats, without a no-response marker.
    #[must_use]
    pub const fn heartbeats(self) -> Self { self.difference(Self::NO_RESPONSE) }

    /// Returns every strict subset of the inbox, smallest bit pattern first.
    #[must_use]
    pub fn strict_subsets(self) -> Vec<Self> {
        (0..=Self::all().bits())
            .map(Self::from_bits_truncate)
            .filter(|candidate| *candidate != self && self.contains(*candidate))
            .collect()
    }

    /// Returns `true` when no unknown bits are set.
    #[must_use]
    pub const fn is_well_formed(self) -> bool { Self::from_bits(self.bits()).is_some() }
}

impl Serialize for HeartbeatInbox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.signals())
    }
}

impl std::fmt::Display for HeartbeatInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (position, signal) in self.signals().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            write!(f, "{signal}")?;
        }
        f.write_str("}")
    }
}
