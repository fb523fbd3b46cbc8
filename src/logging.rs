//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so that reports on stdout stay machine-readable.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Returns the filter directives to use: `RUST_LOG` when set and non-empty,
/// otherwise the configured level.
fn directives(rust_log: Option<String>, level: &str) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_owned())
}

/// Parses filter directives such as `info` or `dualtor_model=debug`.
///
/// # Errors
///
/// Returns an error when the directives are malformed.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter {directives:?}"))
}

/// Installs the global subscriber, honouring `RUST_LOG` over `level`.
///
/// # Errors
///
/// Returns an error for a malformed filter or when a subscriber is already
/// installed.
pub fn init(level: &str) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(parse_filter(&directives(rust_log, level))?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("failed to install the tracing subscriber")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, "info")]
    #[case(Some(""), "info")]
    #[case(Some("dualtor_model=debug"), "dualtor_model=debug")]
    fn rust_log_takes_precedence(#[case] rust_log: Option<&str>, #[case] expected: &str) {
        assert_eq!(directives(rust_log.map(str::to_owned), "info"), expected);
    }

    #[rstest]
    #[case("debug")]
    #[case("warn,dualtor_model=trace")]
    fn accepts_level_directives(#[case] input: &str) {
        assert!(parse_filter(input).is_ok());
    }

    #[test]
    fn rejects_malformed_directives() {
        assert!(parse_filter("dualtor_model=loud").is_err());
    }
}
