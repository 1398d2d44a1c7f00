// crates/portico-server/src/audit.rs
// ============================================================================
// Module: Broker Request Audit
// Description: Structured audit events for broker request handling.
// Purpose: Emit request logs without a hard logging-framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the audit event payload and sinks for broker request
//! logging. It is intentionally lightweight so deployments can route events
//! to their preferred logging pipeline without redesign. Events carry the
//! advisory protocol-version header verbatim; an unrecognized version is
//! recorded, never rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Broker request audit event payload.
///
/// # Invariants
/// - Optional fields are `None` when the metadata is unavailable.
/// - Credentials never appear in events.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Lifecycle operation label.
    pub operation: &'static str,
    /// Service identifier from the request, when routed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Instance identifier from the request path, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Binding identifier from the request path, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_id: Option<String>,
    /// HTTP status returned to the orchestrator.
    pub status: u16,
    /// Advisory protocol-version header, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Peer IP address when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_ip: Option<String>,
    /// Additional detail (auth failures, version advisories).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink for broker request audit events.
pub trait RequestAuditSink: Send + Sync {
    /// Records a request audit event.
    fn record(&self, event: &RequestAuditEvent);
}

/// Audit sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl RequestAuditSink for StderrAuditSink {
    fn record(&self, event: &RequestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink for tests.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopAuditSink;

impl RequestAuditSink for NoopAuditSink {
    fn record(&self, _event: &RequestAuditEvent) {}
}
