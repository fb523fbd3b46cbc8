//! Configuration loading and conversion into an exploration request.
//!
//! [`DualtorConfig`] is layered by `OrthoConfig`: command-line flags override
//! `DUALTOR_*` environment variables, which override `.dualtor.toml`, which
//! overrides the built-in defaults.

pub use cli_defs::DualtorConfig;
use dualtor_model::{
    ConfigError,
    ExplorationRequest,
    request::parse_initial_active,
};

/// Parses the string-typed settings of `config` into a validated request.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found; no search is started.
pub fn build_request(config: &DualtorConfig) -> Result<ExplorationRequest, ConfigError> {
    let request = ExplorationRequest {
        tors: config.tors,
        mode: config.mode.parse()?,
        max_states: config.max_states,
        max_depth: config.max_depth,
        properties: config.properties.parse()?,
        faults: config.faults.parse()?,
        max_faults: config.max_faults,
        wait_policy: config.wait_policy.parse()?,
        initial_active: parse_initial_active(&config.initial_active)?,
        seed: config.seed,
        walks: config.walks,
        walk_length: config.walk_length,
        threads: config.threads,
    };
    request.validate()?;
    Ok(request)
}
