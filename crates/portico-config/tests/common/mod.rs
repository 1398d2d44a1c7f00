// crates/portico-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for portico-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use portico_config::AuthConfig;
use portico_config::PorticoConfig;

/// Parses a TOML string into a `PorticoConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<PorticoConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<PorticoConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns a minimal config carrying valid broker credentials.
pub fn config_with_auth() -> Result<PorticoConfig, toml::de::Error> {
    let mut config = minimal_config()?;
    config.server.auth = Some(AuthConfig {
        username: "broker".to_string(),
        password: "secret".to_string(),
    });
    Ok(config)
}
