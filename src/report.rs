//! Rendering of run reports as text or JSON.

use std::{
    fmt::{self, Write as _},
    str::FromStr,
};

use anyhow::{Context, Result};
use dualtor_model::{
    ConfigError,
    Outcome,
    RunReport,
    tor_model::state::SystemState,
    verdict::{Coverage, Trace, Verdict},
};

/// Output format of the report written to stdout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReportFormat {
    /// Human-readable summary with traces.
    #[default]
    Text,
    /// The full report as pretty-printed JSON.
    Json,
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownValue {
                key: "format",
                value: other.to_owned(),
                expected: "text or json",
            }),
        }
    }
}

/// Returns the lower-case name of `outcome`.
#[must_use]
pub const fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Verified => "verified",
        Outcome::Violated => "violated",
        Outcome::Inconclusive => "inconclusive",
    }
}

/// Renders `report` in `format`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(report: &RunReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(report).context("failed to serialize report")?;
            json.push('\n');
            Ok(json)
        }
        ReportFormat::Text => {
            let mut out = String::new();
            write_text(&mut out, report).context("failed to format report")?;
            Ok(out)
        }
    }
}

fn write_text(out: &mut String, report: &RunReport) -> fmt::Result {
    writeln!(out, "outcome: {}", outcome_label(report.outcome()))?;
    match report {
        RunReport::Exhaustive(check) => {
            let stats = &check.stats;
            writeln!(out, "mode: exhaustive")?;
            writeln!(
                out,
                "states: {} (expanded {}, transitions {}, stuttering {}, max depth {}, complete {})",
                stats.states,
                stats.expanded,
                stats.transitions,
                stats.stuttering_steps,
                stats.max_depth,
                stats.complete
            )?;
            write_coverage(out, &check.coverage)?;
            write_verdict(out, &check.verdict)?;
            if let Some(trace) = &check.deepest_trace {
                writeln!(out, "deepest trace explored:")?;
                write_trace(out, trace)?;
            }
        }
        RunReport::Sample(sample) => {
            writeln!(out, "mode: sample")?;
            writeln!(
                out,
                "seed: {} walks: {} steps: {} distinct states: {}",
                sample.seed, sample.walks, sample.steps, sample.distinct_states
            )?;
            write_coverage(out, &sample.coverage)?;
            write_unchecked(out, &sample.unchecked)?;
            write_verdict(out, &sample.verdict)?;
        }
        RunReport::Sweep(sweep) => {
            writeln!(out, "mode: sweep")?;
            writeln!(
                out,
                "threads: {} unique states: {} complete: {}",
                sweep.threads, sweep.unique_states, sweep.complete
            )?;
            for name in &sweep.violated {
                writeln!(out, "violated: {name}")?;
            }
            for name in &sweep.reached {
                writeln!(out, "  {name}: reached")?;
            }
            for name in &sweep.unreached {
                writeln!(out, "  {name}: not reached")?;
            }
            write_unchecked(out, &sweep.unchecked)?;
        }
    }
    Ok(())
}

fn write_coverage(out: &mut String, coverage: &[Coverage]) -> fmt::Result {
    if coverage.is_empty() {
        return Ok(());
    }
    writeln!(out, "coverage:")?;
    for entry in coverage {
        let status = if entry.reached { "reached" } else { "not reached" };
        writeln!(out, "  {}: {status}", entry.property)?;
    }
    Ok(())
}

fn write_unchecked(out: &mut String, unchecked: &[&str]) -> fmt::Result {
    if unchecked.is_empty() {
        return Ok(());
    }
    writeln!(out, "not checked in this mode: {}", unchecked.join(", "))
}

fn write_verdict(out: &mut String, verdict: &Verdict<SystemState>) -> fmt::Result {
    match verdict {
        Verdict::Verified => Ok(()),
        Verdict::Inconclusive(reason) => writeln!(out, "stopped early: {reason}"),
        Verdict::Violated(violations) => {
            for violation in violations {
                writeln!(out, "violation: {} ({})", violation.property, violation.kind)?;
                write_trace(out, &violation.trace)?;
            }
            Ok(())
        }
    }
}

fn write_trace(out: &mut String, trace: &Trace<SystemState>) -> fmt::Result {
    for (index, step) in trace.steps.iter().enumerate() {
        let action = step.action.as_deref().unwrap_or("<initial>");
        writeln!(out, "  {index:>3}: {action}")?;
        writeln!(out, "       {}", step.state)?;
    }
    if !trace.cycle.is_empty() {
        writeln!(out, "  cycle:")?;
        for step in &trace.cycle {
            let action = step.action.as_deref().unwrap_or("<stutter>");
            writeln!(out, "       {action}")?;
            writeln!(out, "       {}", step.state)?;
        }
    }
    if trace.stutters {
        writeln!(out, "  then stutters forever")?;
    }
    Ok(())
}
