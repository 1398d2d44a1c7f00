// crates/portico-core/src/core/catalog.rs
// ============================================================================
// Module: Portico Catalog Model
// Description: Immutable description of advertised services and plans.
// Purpose: Provide the canonical wire shape for the catalog endpoint.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The catalog model describes the services and plans a broker advertises to
//! the orchestrator. It is built once from the service registry and rendered
//! verbatim on the catalog endpoint; rendering is pure and deterministic, so
//! repeated renders of the same catalog are byte-identical.
//! Invariants:
//! - Service identifiers are unique across the catalog.
//! - Plan identifiers are unique within their owning service.
//! - Service and plan order is preserved exactly as registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::PlanId;
use crate::core::identifiers::ServiceId;

// ============================================================================
// SECTION: Catalog Types
// ============================================================================

/// Full advertisable catalog returned by the catalog endpoint.
///
/// # Invariants
/// - `services` preserves registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Advertised service offerings.
    pub services: Vec<Service>,
}

/// Description of a single advertised service offering.
///
/// # Invariants
/// - `id` is globally unique across the broker's catalog.
/// - `plans` may be empty, signalling no offerable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Globally unique service identifier.
    pub id: ServiceId,
    /// Human-readable service name.
    pub name: String,
    /// Human-readable service description.
    pub description: String,
    /// Whether instances of this service can be bound.
    pub bindable: bool,
    /// Whether provisioned instances accept plan or parameter updates.
    pub plan_updateable: bool,
    /// Free-form classification tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form service metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    /// Platform permissions this service requires.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Permission>,
    /// Plans offered for this service, in registration order.
    pub plans: Vec<Plan>,
    /// Optional single-sign-on client for a service dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<DashboardClient>,
}

/// Description of a single service plan.
///
/// # Invariants
/// - `id` is unique within the owning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier, unique within the owning service.
    pub id: PlanId,
    /// Human-readable plan name.
    pub name: String,
    /// Human-readable plan description.
    pub description: String,
    /// Whether the plan is free of charge.
    pub free: bool,
    /// Free-form plan metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// Platform permission a service may require from the orchestrator.
///
/// # Invariants
/// - Variants are stable wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Stream application logs to a syslog drain.
    SyslogDrain,
    /// Forward application route traffic through the service.
    RouteForwarding,
    /// Mount volumes into application containers.
    VolumeMount,
}

impl Permission {
    /// Returns the stable wire label for the permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyslogDrain => "syslog_drain",
            Self::RouteForwarding => "route_forwarding",
            Self::VolumeMount => "volume_mount",
        }
    }
}

/// Single-sign-on client registration for a service dashboard.
///
/// # Invariants
/// - `redirect_uri` parses as a URL; validated at service registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardClient {
    /// OAuth client identifier.
    pub id: String,
    /// OAuth client secret.
    pub secret: String,
    /// Redirect URI for the dashboard SSO flow.
    pub redirect_uri: String,
}
