//! Error types for request validation and scripted simulation.

use thiserror::Error;

/// A malformed exploration request, rejected before any search starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A string-typed setting holds a value outside its vocabulary.
    #[error("invalid {key} value {value:?}: expected {expected}")]
    UnknownValue {
        /// Configuration key.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Human-readable list of accepted values.
        expected: &'static str,
    },
    /// Only two controllers are modelled.
    #[error("unsupported ToR count {0}: the model covers exactly 2 ToRs")]
    UnsupportedTorCount(usize),
    /// A numeric setting that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// No property class was selected.
    #[error("no properties selected: choose at least one of invariants, safety, liveness")]
    NoProperties,
    /// Random walks and the stateright sweep evaluate invariants only.
    #[error("{mode} mode checks invariants only: select invariants or use exhaustive mode")]
    InvariantsOnly {
        /// Mode that cannot honour the selection.
        mode: &'static str,
    },
    /// No initial cable direction was configured.
    #[error("no initial MUX direction configured")]
    NoInitialState,
}

/// A failure while replaying a script or running a scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The model has no initial state to start from.
    #[error("model has no initial state")]
    NoInitialState,
    /// The requested action is disabled or would not change the state.
    #[error("step {step}: action {action} is not enabled")]
    ActionNotEnabled {
        /// Zero-based index of the failing step.
        step: usize,
        /// Label of the rejected action.
        action: String,
    },
    /// The scheduler ran out of steps before the goal held.
    #[error("goal not reached within {max_steps} steps")]
    StepLimitReached {
        /// Step limit that was exhausted.
        max_steps: usize,
    },
    /// No fair action is enabled, so the behaviour stutters forever.
    #[error("no fair action enabled after {steps} steps")]
    Quiescent {
        /// Steps taken before quiescence.
        steps: usize,
    },
}
