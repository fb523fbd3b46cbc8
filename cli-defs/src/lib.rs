//! Shared CLI type definitions for the `dualtor` build script and binary.
//!
//! The build script renders a man page from these types and the binary loads
//! its configuration through them. Keeping them in their own crate lets
//! `build.rs` depend on clap without pulling in the model checker.

// FIXME: File-wide suppressions are unavoidable here. Clap and OrthoConfig derive macros
// inject generated code throughout the module, and there is no mechanism to narrow
// the scope without restructuring the crate.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![expect(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Default state budget for exhaustive search and sweeps.
pub const DEFAULT_MAX_STATES: usize = 1_000_000;
/// Default number of random walks in sampling mode.
pub const DEFAULT_WALKS: usize = 100;
/// Default steps per random walk.
pub const DEFAULT_WALK_LENGTH: usize = 200;

/// Verification settings.
///
/// String-typed keys are parsed into the model's own types by the binary, so
/// that malformed values surface as configuration errors rather than clap
/// usage errors.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "DUALTOR_")]
pub struct DualtorConfig {
    /// Search mode: `exhaustive`, `sample`, or `sweep`.
    #[ortho_config(default = "exhaustive".to_owned())]
    #[arg(long)]
    pub mode: String,
    /// Number of ToR controllers; only 2 is supported.
    #[ortho_config(default = 2)]
    #[arg(long)]
    pub tors: usize,
    /// Maximum number of distinct states to explore.
    #[ortho_config(default = DEFAULT_MAX_STATES)]
    #[arg(long)]
    pub max_states: usize,
    /// Optional BFS depth bound for exhaustive search and sweeps.
    #[arg(long)]
    pub max_depth: Option<usize>,
    /// Property classes: `all`, or a list of `invariants`, `safety`, `liveness`.
    /// Sample and sweep modes need `invariants` and skip the temporal classes.
    #[ortho_config(default = "all".to_owned())]
    #[arg(long)]
    pub properties: String,
    /// Fault kinds: `all`, `none`, or a comma list such as `fail-tor,fail-mux`.
    #[ortho_config(default = "all".to_owned())]
    #[arg(long)]
    pub faults: String,
    /// Maximum faults injected per behaviour.
    #[arg(long)]
    pub max_faults: Option<u8>,
    /// Progress rule in `Wait`: `recheck` or `decay`.
    #[ortho_config(default = "recheck".to_owned())]
    #[arg(long)]
    pub wait_policy: String,
    /// Initial cable direction: `a`, `b`, or `both`.
    #[ortho_config(default = "both".to_owned())]
    #[arg(long)]
    pub initial_active: String,
    /// Seed for sampling mode; random when unset.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of random walks in sampling mode.
    #[ortho_config(default = DEFAULT_WALKS)]
    #[arg(long)]
    pub walks: usize,
    /// Steps per random walk.
    #[ortho_config(default = DEFAULT_WALK_LENGTH)]
    #[arg(long)]
    pub walk_length: usize,
    /// Worker threads for sweep mode.
    #[ortho_config(default = 1)]
    #[arg(long)]
    pub threads: usize,
    /// Report format: `text` or `json`.
    #[ortho_config(default = "text".to_owned())]
    #[arg(long)]
    pub format: String,
    /// Log filter used when `RUST_LOG` is unset.
    #[ortho_config(default = "info".to_owned())]
    #[arg(long)]
    pub log_level: String,
}

/// Top-level CLI entry point consumed by the build script.
#[derive(Parser, Serialize)]
#[command(
    name = "dualtor",
    about = "Model-check the dual-ToR MUX failover protocol"
)]
pub struct Cli {
    /// CLI configuration overrides (merged with files and defaults at runtime).
    #[command(flatten)]
    pub config: DualtorConfigCli,
}
