//! Model checking for the dual-ToR MUX failover protocol.
//!
//! Two top-of-rack controllers share one MUX cable. This crate models their
//! MUX state machines, transceiver drivers, link probers, and heartbeats
//! together with injected faults, and checks the protocol three ways:
//!
//! - [`explorer`] runs an exhaustive breadth-first search, evaluating
//!   invariants on every state and temporal properties under weak fairness
//!   via [`fairness`].
//! - [`simulation`] samples seeded random walks and replays scripted or
//!   round-robin scenarios.
//! - [`sweep`] hands invariants and reachability goals to stateright's
//!   multi-threaded checker.
//!
//! [`request`] ties a validated [`request::ExplorationRequest`] to one of
//! these modes and returns a serializable report.

pub mod error;
pub mod explorer;
pub mod fairness;
pub mod request;
pub mod simulation;
pub mod sweep;
pub mod tor_model;
pub mod verdict;

pub use self::{
    error::{ConfigError, SimulationError},
    request::{ExplorationRequest, Outcome, RunReport, run},
};
