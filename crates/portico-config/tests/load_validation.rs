//! Config load validation tests for portico-config.
// crates/portico-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (size, parse, validation).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;

use portico_config::ConfigError;
use portico_config::PorticoConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<PorticoConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(PorticoConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[server\nbind=").map_err(|err| err.to_string())?;
    assert_invalid(PorticoConfig::load(Some(file.path())), "config parse error")?;
    Ok(())
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(PorticoConfig::load(Some(&path)), "config io error")?;
    Ok(())
}

#[test]
fn load_accepts_minimal_valid_config() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(
        b"[server]\nbind = \"127.0.0.1:8472\"\n\n[server.auth]\nusername = \"broker\"\npassword \
          = \"secret\"\n",
    )
    .map_err(|err| err.to_string())?;
    let config = PorticoConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    assert_eq!(config.server.bind, "127.0.0.1:8472");
    assert_eq!(config.reconcile.interval_secs, 3_600);
    assert_eq!(config.reconcile.grace_secs, 300);
    assert!(config.reconcile.enabled);
    Ok(())
}

#[test]
fn load_rejects_config_without_credentials() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[server]\nbind = \"127.0.0.1:8472\"\n").map_err(|err| err.to_string())?;
    assert_invalid(PorticoConfig::load(Some(file.path())), "server.auth is required")?;
    Ok(())
}
