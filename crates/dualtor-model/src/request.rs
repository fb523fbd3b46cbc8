//! Exploration requests: validation and dispatch to the three modes.

use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::info;

use crate::{
    error::ConfigError,
    explorer::{ExploreOptions, PropertySelection, check},
    simulation::{SamplingPlan, SamplingReport, sample},
    sweep::{SweepPlan, SweepReport, sweep},
    tor_model::{
        DualTorModel,
        WaitPolicy,
        faults::FaultSet,
        state::{SystemState, TorId},
    },
    verdict::{CheckReport, Verdict},
};

/// Number of controllers the model covers.
pub const SUPPORTED_TORS: usize = 2;

/// How the state space is searched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExplorationMode {
    /// Breadth-first search of every reachable state.
    #[default]
    Exhaustive,
    /// Seeded random walks.
    Sample,
    /// Multi-threaded stateright sweep of invariants and reachability.
    Sweep,
}

impl FromStr for ExplorationMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "exhaustive" => Ok(Self::Exhaustive),
            "sample" => Ok(Self::Sample),
            "sweep" => Ok(Self::Sweep),
            other => Err(ConfigError::UnknownValue {
                key: "mode",
                value: other.to_owned(),
                expected: "exhaustive, sample, or sweep",
            }),
        }
    }
}

impl ExplorationMode {
    /// Returns the configuration name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exhaustive => "exhaustive",
            Self::Sample => "sample",
            Self::Sweep => "sweep",
        }
    }

    /// Returns `true` for modes that only evaluate invariants and
    /// reachability.
    #[must_use]
    pub const fn is_invariants_only(self) -> bool { matches!(self, Self::Sample | Self::Sweep) }
}

impl fmt::Display for ExplorationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Parses an initial cable direction setting: `a`, `b`, or `both`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownValue`] for anything else.
pub fn parse_initial_active(value: &str) -> Result<Vec<TorId>, ConfigError> {
    if value.trim().eq_ignore_ascii_case("both") {
        return Ok(TorId::ALL.to_vec());
    }
    value
        .parse::<TorId>()
        .map(|tor| vec![tor])
        .map_err(|_| ConfigError::UnknownValue {
            key: "initial_active",
            value: value.to_owned(),
            expected: "a, b, or both",
        })
}

/// A complete, typed description of one verification run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplorationRequest {
    /// Number of controllers; only two are supported.
    pub tors: usize,
    /// Search mode.
    pub mode: ExplorationMode,
    /// State budget.
    pub max_states: usize,
    /// Optional depth bound for exhaustive search.
    pub max_depth: Option<usize>,
    /// Property classes to evaluate.
    pub properties: PropertySelection,
    /// Fault kinds the environment may inject.
    pub faults: FaultSet,
    /// Optional per-behaviour fault budget.
    pub max_faults: Option<u8>,
    /// Progress rule for controllers in `Wait`.
    pub wait_policy: WaitPolicy,
    /// Initial cable directions.
    pub initial_active: Vec<TorId>,
    /// Seed for sampling; drawn at random when absent.
    pub seed: Option<u64>,
    /// Number of random walks.
    pub walks: usize,
    /// Steps per random walk.
    pub walk_length: usize,
    /// Worker threads for the sweep.
    pub threads: usize,
}

impl Default for ExplorationRequest {
    fn default() -> Self {
        Self {
            tors: SUPPORTED_TORS,
            mode: ExplorationMode::default(),
            max_states: ExploreOptions::default().max_states,
            max_depth: None,
            properties: PropertySelection::all(),
            faults: FaultSet::all(),
            max_faults: None,
            wait_policy: WaitPolicy::default(),
            initial_active: TorId::ALL.to_vec(),
            seed: None,
            walks: 100,
            walk_length: 200,
            threads: 1,
        }
    }
}

/// Outcome of a run, shaped by its mode.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RunReport {
    /// Exhaustive search result.
    Exhaustive(CheckReport<SystemState>),
    /// Random walk result.
    Sample(SamplingReport<SystemState>),
    /// Stateright sweep result.
    Sweep(SweepReport),
}

/// Overall outcome, which the binary maps to an exit code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// No violation found.
    Verified,
    /// Some property fails.
    Violated,
    /// Search stopped early without a violation.
    Inconclusive,
}

impl RunReport {
    /// Summarises the report as a single outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Exhaustive(report) => verdict_outcome(&report.verdict),
            Self::Sample(report) => match verdict_outcome(&report.verdict) {
                Outcome::Verified if !report.unchecked.is_empty() => Outcome::Inconclusive,
                outcome => outcome,
            },
            Self::Sweep(report) if !report.violated.is_empty() => Outcome::Violated,
            Self::Sweep(report) if report.complete && report.unchecked.is_empty() => {
                Outcome::Verified
            }
            Self::Sweep(_) => Outcome::Inconclusive,
        }
    }
}

const fn verdict_outcome<S>(verdict: &Verdict<S>) -> Outcome {
    match verdict {
        Verdict::Verified => Outcome::Verified,
        Verdict::Violated(_) => Outcome::Violated,
        Verdict::Inconclusive(_) => Outcome::Inconclusive,
    }
}

impl ExplorationRequest {
    /// Checks that the request describes a runnable search.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tors != SUPPORTED_TORS {
            return Err(ConfigError::UnsupportedTorCount(self.tors));
        }
        if self.max_states == 0 {
            return Err(ConfigError::Zero("max_states"));
        }
        if self.properties.is_empty() {
            return Err(ConfigError::NoProperties);
        }
        if self.initial_active.is_empty() {
            return Err(ConfigError::NoInitialState);
        }
        if self.mode.is_invariants_only() && !self.properties.contains(PropertySelection::INVARIANTS)
        {
            return Err(ConfigError::InvariantsOnly {
                mode: self.mode.as_str(),
            });
        }
        match self.mode {
            ExplorationMode::Sample if self.walks == 0 => Err(ConfigError::Zero("walks")),
            ExplorationMode::Sample if self.walk_length == 0 => {
                Err(ConfigError::Zero("walk_length"))
            }
            ExplorationMode::Sweep if self.threads == 0 => Err(ConfigError::Zero("threads")),
            ExplorationMode::Sweep if self.max_depth == Some(0) => {
                Err(ConfigError::Zero("max_depth"))
            }
            _ => Ok(()),
        }
    }

    /// Builds the model this request describes.
    #[must_use]
    pub fn model(&self) -> DualTorModel {
        DualTorModel {
            faults: self.faults,
            max_faults: self.max_faults,
            wait_policy: self.wait_policy,
            initial_active: self.initial_active.clone(),
        }
    }

    /// Returns the selected temporal property classes, which only exhaustive
    /// search evaluates.
    #[must_use]
    pub fn temporal_selection(&self) -> Vec<&'static str> {
        self.properties
            .difference(PropertySelection::INVARIANTS)
            .names()
    }

    /// Returns the exhaustive search options.
    #[must_use]
    pub const fn explore_options(&self) -> ExploreOptions {
        ExploreOptions {
            max_states: self.max_states,
            max_depth: self.max_depth,
            properties: self.properties,
        }
    }
}

/// Validates `request` and runs it.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the request is malformed; no search is
/// started in that case.
pub fn run(request: &ExplorationRequest) -> Result<RunReport, ConfigError> {
    request.validate()?;
    let model = request.model();
    info!(
        mode = %request.mode,
        faults = ?request.faults.names(),
        wait_policy = %request.wait_policy,
        "running verification"
    );
    Ok(match request.mode {
        ExplorationMode::Exhaustive => {
            RunReport::Exhaustive(check(&model, &request.explore_options()))
        }
        ExplorationMode::Sample => {
            let plan = SamplingPlan {
                seed: request.seed.unwrap_or_else(rand::random),
                walks: request.walks,
                walk_length: request.walk_length,
            };
            let invariants = request.properties.contains(PropertySelection::INVARIANTS);
            let mut report = sample(&model, plan, invariants);
            report.unchecked = request.temporal_selection();
            RunReport::Sample(report)
        }
        ExplorationMode::Sweep => {
            let plan = SweepPlan {
                threads: request.threads,
                max_states: request.max_states,
                max_depth: request.max_depth,
            };
            let mut report = sweep(model, plan);
            report.unchecked = request.temporal_selection();
            RunReport::Sweep(report)
        }
    })
}
