//! Command-line front end for the dual-ToR model checker.
//!
//! The binary stays a thin wrapper: configuration loading, logging setup,
//! report rendering, and exit codes live here so they can be tested without
//! spawning a process. The model itself lives in `dualtor_model`.

pub mod config;
pub mod logging;
pub mod report;
pub mod runner;

pub use runner::{run, run_with_config};
