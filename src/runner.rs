//! Ties configuration, logging, the model checker, and reporting together.

use std::{
    io::{self, Write},
    process::ExitCode,
};

use anyhow::{Context, Result};
use dualtor_model::Outcome;
use ortho_config::OrthoConfig;
use tracing::info;

use crate::{
    config::{DualtorConfig, build_request},
    logging,
    report::{ReportFormat, outcome_label, render},
};

/// Exit status when no violation exists.
pub const EXIT_VERIFIED: u8 = 0;
/// Exit status when a property fails.
pub const EXIT_VIOLATED: u8 = 1;
/// Exit status when a budget or bound stopped the search.
pub const EXIT_INCONCLUSIVE: u8 = 2;
/// Exit status for configuration and I/O errors.
pub const EXIT_ERROR: u8 = 3;

/// Maps an outcome to the process exit status.
#[must_use]
pub const fn exit_code(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Verified => EXIT_VERIFIED,
        Outcome::Violated => EXIT_VIOLATED,
        Outcome::Inconclusive => EXIT_INCONCLUSIVE,
    }
}

/// Loads configuration from the process arguments, environment, and
/// dotfile, runs the requested check, and prints the report to stdout.
///
/// # Errors
///
/// Returns an error when configuration is malformed or the report cannot be
/// written.
pub fn run() -> Result<ExitCode> {
    let config = DualtorConfig::load_from_iter(std::env::args_os())
        .context("failed to load configuration")?;
    logging::init(&config.log_level)?;
    let (outcome, rendered) = run_with_config(&config)?;
    io::stdout()
        .lock()
        .write_all(rendered.as_bytes())
        .context("failed to write report")?;
    Ok(ExitCode::from(exit_code(outcome)))
}

/// Runs the check described by `config` and renders its report.
///
/// # Errors
///
/// Returns an error when configuration is malformed or rendering fails.
pub fn run_with_config(config: &DualtorConfig) -> Result<(Outcome, String)> {
    let format: ReportFormat = config.format.parse().context("invalid configuration")?;
    let request = build_request(config).context("invalid configuration")?;
    let report = dualtor_model::run(&request).context("invalid configuration")?;
    let outcome = report.outcome();
    info!(outcome = outcome_label(outcome), "verification finished");
    Ok((outcome, render(&report, format)?))
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    fn load(args: &[&str]) -> DualtorConfig {
        DualtorConfig::load_from_iter(args.iter().copied()).expect("load")
    }

    #[rstest]
    #[case(Outcome::Verified, 0)]
    #[case(Outcome::Violated, 1)]
    #[case(Outcome::Inconclusive, 2)]
    fn outcomes_map_to_exit_codes(#[case] outcome: Outcome, #[case] expected: u8) {
        assert_eq!(exit_code(outcome), expected);
    }

    #[rstest]
    fn small_budget_exits_inconclusive() {
        Jail::expect_with(|_j| {
            let config = load(&[
                "dualtor",
                "--max-states",
                "100",
                "--properties",
                "invariants",
            ]);
            let (outcome, text) = run_with_config(&config).expect("run");
            assert_eq!(exit_code(outcome), EXIT_INCONCLUSIVE);
            assert!(text.contains("stopped early: state budget of 100 states exceeded"));
            Ok(())
        });
    }

    #[rstest]
    fn seeded_sampling_verifies_invariants() {
        Jail::expect_with(|_j| {
            let config = load(&[
                "dualtor",
                "--mode",
                "sample",
                "--seed",
                "3",
                "--walks",
                "5",
                "--walk-length",
                "40",
                "--properties",
                "invariants",
                "--format",
                "json",
            ]);
            let (outcome, json) = run_with_config(&config).expect("run");
            assert_eq!(outcome, Outcome::Verified);
            let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
            assert_eq!(value["mode"], "sample");
            assert_eq!(value["seed"], 3);
            Ok(())
        });
    }

    #[rstest]
    fn malformed_format_is_rejected_before_search() {
        Jail::expect_with(|_j| {
            let config = load(&["dualtor", "--format", "xml"]);
            let err = run_with_config(&config).expect_err("malformed");
            assert!(format!("{err:#}").contains("xml"));
            Ok(())
        });
    }
}
