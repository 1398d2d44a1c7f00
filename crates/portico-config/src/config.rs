// crates/portico-config/src/config.rs
// ============================================================================
// Module: Portico Configuration
// Description: Configuration loading and validation for the Portico broker.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits. Missing
//! or invalid configuration fails closed: broker credentials are mandatory,
//! the bind address must parse, and reconciliation timing is bounded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "portico.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "PORTICO_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Maximum length of a broker credential (username or password).
pub(crate) const MAX_CREDENTIAL_LENGTH: usize = 256;
/// Default bind address for the broker HTTP surface.
const DEFAULT_BIND: &str = "127.0.0.1:8472";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;
/// Minimum allowed request body limit in bytes.
const MIN_MAX_BODY_BYTES: usize = 1024;
/// Maximum allowed request body limit in bytes.
const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Default reconciliation sweep interval in seconds.
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 3_600;
/// Minimum reconciliation sweep interval in seconds.
const MIN_RECONCILE_INTERVAL_SECS: u64 = 1;
/// Maximum reconciliation sweep interval in seconds.
const MAX_RECONCILE_INTERVAL_SECS: u64 = 7 * 86_400;
/// Default orphan grace period in seconds.
const DEFAULT_GRACE_SECS: u64 = 300;
/// Maximum orphan grace period in seconds.
const MAX_GRACE_SECS: u64 = 86_400;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Portico broker configuration.
///
/// # Invariants
/// - `validate` has been called before the config reaches the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PorticoConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Reconciliation sweep configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// HTTP server configuration.
///
/// # Invariants
/// - `bind` parses as a socket address after validation.
/// - `auth` is mandatory; the broker never serves unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Socket address the broker listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Broker API credentials for HTTP Basic authentication.
    pub auth: Option<AuthConfig>,
    /// Maximum allowed request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            auth: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Broker API credentials.
///
/// # Invariants
/// - Both fields are non-empty after validation.
/// - `username` contains no colon (HTTP Basic separator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Username the orchestrator authenticates with.
    pub username: String,
    /// Password the orchestrator authenticates with.
    pub password: String,
}

/// Reconciliation sweep configuration.
///
/// # Invariants
/// - `interval_secs` is within `[1, 604800]` after validation.
/// - `grace_secs` of zero disables the orphan grace guard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcileConfig {
    /// Whether the periodic sweep runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweep ticks.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    /// Seconds an orphan candidate must age before removal.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reconcile_interval_secs(),
            grace_secs: default_grace_secs(),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns true (serde default helper).
const fn default_true() -> bool {
    true
}

/// Returns the default sweep interval.
const fn default_reconcile_interval_secs() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_SECS
}

/// Returns the default orphan grace period.
const fn default_grace_secs() -> u64 {
    DEFAULT_GRACE_SECS
}

// ============================================================================
// SECTION: Loading & Validation
// ============================================================================

impl PorticoConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// Resolution order: explicit `path`, then the `PORTICO_CONFIG`
    /// environment variable, then `./portico.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(path);
        let metadata = fs::metadata(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let text = fs::read_to_string(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: Self =
            toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, failing closed on any violation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.reconcile.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    /// Validates server settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address does not parse,
    /// credentials are missing or malformed, or the body limit is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.bind is not a socket address: {}",
                self.bind
            )));
        }
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("server.auth is required".to_string()))?;
        auth.validate()?;
        if self.max_body_bytes < MIN_MAX_BODY_BYTES || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid("server.max_body_bytes out of range".to_string()));
        }
        Ok(())
    }
}

impl AuthConfig {
    /// Validates broker credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a credential is empty, too long,
    /// or the username contains the Basic-auth separator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_credential("server.auth.username", &self.username)?;
        validate_credential("server.auth.password", &self.password)?;
        if self.username.contains(':') {
            return Err(ConfigError::Invalid(
                "server.auth.username must not contain a colon".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReconcileConfig {
    /// Validates reconciliation timing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the interval or grace period is
    /// out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs < MIN_RECONCILE_INTERVAL_SECS
            || self.interval_secs > MAX_RECONCILE_INTERVAL_SECS
        {
            return Err(ConfigError::Invalid("reconcile.interval_secs out of range".to_string()));
        }
        if self.grace_secs > MAX_GRACE_SECS {
            return Err(ConfigError::Invalid("reconcile.grace_secs out of range".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

/// Validates a single credential field.
fn validate_credential(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_CREDENTIAL_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}
