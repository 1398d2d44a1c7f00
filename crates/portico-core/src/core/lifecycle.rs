// crates/portico-core/src/core/lifecycle.rs
// ============================================================================
// Module: Portico Lifecycle Messages
// Description: Request and response payloads for the resource lifecycle protocol.
// Purpose: Provide the canonical wire bodies for provision, update, bind, and delete.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Lifecycle messages mirror the orchestrator's wire bodies field for field.
//! Requests are deserialized from inbound HTTP payloads; responses are the
//! success bodies the dispatcher renders. Handler outcome types carry the
//! created-versus-existed flag that drives 201/200 selection without the
//! dispatcher tracking request identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::PlanId;
use crate::core::identifiers::ServiceId;

// ============================================================================
// SECTION: Provision
// ============================================================================

/// Provision request body for a new service instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisionRequest {
    /// Catalog service identifier to provision.
    pub service_id: ServiceId,
    /// Catalog plan identifier to provision.
    pub plan_id: PlanId,
    /// Organization GUID owning the instance.
    pub organization_guid: String,
    /// Space GUID owning the instance.
    pub space_guid: String,
    /// Free-form provisioning parameters.
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// Handler outcome for a provision call.
///
/// # Invariants
/// - `created` is false when the instance already existed (idempotent retry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Whether the handler created a new instance.
    pub created: bool,
    /// Optional dashboard URL for the instance.
    pub dashboard_url: Option<String>,
}

/// Success body for a provision call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    /// Optional dashboard URL for the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

// ============================================================================
// SECTION: Update
// ============================================================================

/// Instance attributes prior to an update request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PreviousValues {
    /// Service identifier before the update.
    #[serde(default)]
    pub service_id: Option<ServiceId>,
    /// Plan identifier before the update.
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    /// Organization identifier before the update.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Space identifier before the update.
    #[serde(default)]
    pub space_id: Option<String>,
}

/// Update request body for an existing service instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateRequest {
    /// Catalog service identifier of the instance.
    pub service_id: ServiceId,
    /// Target plan identifier.
    pub plan_id: PlanId,
    /// Free-form update parameters.
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Instance attributes prior to the update.
    #[serde(default)]
    pub previous_values: Option<PreviousValues>,
}

// ============================================================================
// SECTION: Bind
// ============================================================================

/// Resource a binding attaches to, when the orchestrator supplies one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct BindResource {
    /// Application GUID for app bindings.
    #[serde(default)]
    pub app_guid: Option<String>,
    /// Route for route-service bindings.
    #[serde(default)]
    pub route: Option<String>,
}

/// Bind request body for a new service binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BindRequest {
    /// Catalog service identifier of the bound instance.
    pub service_id: ServiceId,
    /// Catalog plan identifier of the bound instance.
    pub plan_id: PlanId,
    /// Application GUID, when binding directly to an application.
    #[serde(default)]
    pub app_guid: Option<String>,
    /// Resource the binding attaches to.
    #[serde(default)]
    pub bind_resource: Option<BindResource>,
    /// Free-form binding parameters.
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// Handler outcome for a bind call.
///
/// # Invariants
/// - `created` is false when the binding already existed (idempotent retry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Whether the handler created a new binding.
    pub created: bool,
    /// Credentials exposed to the bound application.
    pub credentials: Value,
    /// Optional syslog drain URL.
    pub syslog_drain_url: Option<String>,
    /// Optional route service URL.
    pub route_service_url: Option<String>,
}

/// Success body for a bind call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResponse {
    /// Credentials exposed to the bound application.
    pub credentials: Value,
    /// Optional syslog drain URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
    /// Optional route service URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
}

// ============================================================================
// SECTION: Delete
// ============================================================================

/// Deprovision request derived from delete query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeprovisionRequest {
    /// Catalog service identifier of the instance.
    pub service_id: ServiceId,
    /// Catalog plan identifier of the instance.
    pub plan_id: PlanId,
}

/// Unbind request derived from delete query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnbindRequest {
    /// Catalog service identifier of the bound instance.
    pub service_id: ServiceId,
    /// Catalog plan identifier of the bound instance.
    pub plan_id: PlanId,
}
