// crates/portico-server/src/auth.rs
// ============================================================================
// Module: Broker Authentication
// Description: HTTP Basic credential enforcement for the broker surface.
// Purpose: Provide strict, fail-closed auth for every lifecycle endpoint.
// Dependencies: base64, subtle
// ============================================================================

//! ## Overview
//! Every broker endpoint requires HTTP Basic authentication against the
//! operator-configured credentials. Parsing is strict and fail-closed, and
//! credential comparison is constant-time so response timing leaks nothing
//! about how much of a guess matched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header size in bytes.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors for broker requests.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never echo submitted credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authorization header is missing.
    #[error("missing authorization header")]
    MissingHeader,
    /// Authorization header is not a well-formed Basic credential.
    #[error("malformed authorization header")]
    Malformed,
    /// Submitted credentials do not match the configured pair.
    #[error("invalid credentials")]
    InvalidCredentials,
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Operator-configured broker API credentials.
///
/// # Invariants
/// - Comparison against submitted credentials is constant-time.
pub struct BrokerCredentials {
    /// Expected username.
    username: String,
    /// Expected password.
    password: String,
}

impl BrokerCredentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns true when the submitted pair matches.
    #[must_use]
    fn matches(&self, username: &str, password: &str) -> bool {
        let username_ok = self.username.as_bytes().ct_eq(username.as_bytes());
        let password_ok = self.password.as_bytes().ct_eq(password.as_bytes());
        bool::from(username_ok & password_ok)
    }
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Authorizes a request from its raw authorization header.
///
/// # Errors
///
/// Returns [`AuthError`] when the header is missing, malformed, or carries
/// credentials that do not match.
pub fn authorize_basic(
    credentials: &BrokerCredentials,
    auth_header: Option<&str>,
) -> Result<(), AuthError> {
    let header = auth_header.ok_or(AuthError::MissingHeader)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Malformed);
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let encoded = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("basic") || encoded.is_empty() {
        return Err(AuthError::Malformed);
    }
    let decoded = STANDARD.decode(encoded).map_err(|_| AuthError::Malformed)?;
    let pair = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (username, password) = pair.split_once(':').ok_or(AuthError::Malformed)?;
    if !credentials.matches(username, password) {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
