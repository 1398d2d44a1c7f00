// crates/portico-broker/src/dispatch.rs
// ============================================================================
// Module: Protocol Dispatcher
// Description: Lifecycle state machine between the HTTP surface and handlers.
// Purpose: Translate requests into handler calls and results into wire replies.
// Dependencies: portico-core, serde_json
// ============================================================================

//! ## Overview
//! The dispatcher is the single place where handler results and domain errors
//! become protocol-correct replies. It resolves the service identifier before
//! any handler runs, performs exactly one handler invocation per request, and
//! maps the created-versus-existed flag to 201/200 so handlers can implement
//! idempotent retries without the dispatcher tracking request identity.
//! Invariants:
//! - An unresolvable `service_id` fails with 404 before any handler runs.
//! - Conflict replies carry status 409 and an empty JSON object body.
//! - Delete replies for missing resources carry status 410 and `{}`.
//! - Every error reply other than 409/410 carries a `description` field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use portico_core::BindRequest;
use portico_core::BindResponse;
use portico_core::BindingId;
use portico_core::Catalog;
use portico_core::DeprovisionRequest;
use portico_core::InstanceId;
use portico_core::ProvisionRequest;
use portico_core::ProvisionResponse;
use portico_core::ServiceError;
use portico_core::UnbindRequest;
use portico_core::UpdateRequest;
use serde_json::Value;
use serde_json::json;

use crate::registry::RegisteredService;
use crate::registry::ServiceRegistry;

// ============================================================================
// SECTION: Reply
// ============================================================================

/// Transport-agnostic lifecycle reply.
///
/// # Invariants
/// - `body` is always a well-formed JSON value; the HTTP layer serializes it
///   verbatim and never synthesizes its own error shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code to surface.
    pub status: u16,
    /// JSON response body.
    pub body: Value,
}

impl Reply {
    /// Builds a success reply with the given status and body.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
        }
    }

    /// Builds a reply with an empty JSON object body.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: json!({}),
        }
    }

    /// Builds the reply for a domain error.
    ///
    /// Conflict and gone replies carry an empty object body; every other
    /// error carries its description.
    #[must_use]
    pub fn from_error(error: &ServiceError) -> Self {
        let status = error.http_status();
        match error {
            ServiceError::Conflict | ServiceError::Gone => Self::empty(status),
            ServiceError::Broker {
                message, ..
            } => Self::new(status, json!({ "description": message })),
            ServiceError::Unexpected(message) => {
                Self::new(status, json!({ "description": message }))
            }
            other => Self::new(status, json!({ "description": other.to_string() })),
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Protocol dispatcher over an immutable service registry.
///
/// # Invariants
/// - Holds no mutable request-affecting state; concurrent requests require
///   no locking beyond what handlers need for their own resources.
pub struct Dispatcher {
    /// Immutable routing table built at startup.
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the full advertisable catalog.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.registry.build_catalog()
    }

    /// Handles a provision request for a service instance.
    #[must_use]
    pub fn provision(&self, instance_id: &InstanceId, request: &ProvisionRequest) -> Reply {
        let service = match self.route(request) {
            Ok(service) => service,
            Err(reply) => return reply,
        };
        if !service.offering().plans.iter().any(|plan| plan.id == request.plan_id) {
            return Reply::from_error(&ServiceError::NotFound(format!(
                "unknown plan id: {}",
                request.plan_id
            )));
        }
        match service.handlers().provision().provision(instance_id, request) {
            Ok(outcome) => {
                let status = if outcome.created { 201 } else { 200 };
                let body = ProvisionResponse {
                    dashboard_url: outcome.dashboard_url,
                };
                Reply::new(status, json_body(&body))
            }
            Err(err) => Reply::from_error(&err),
        }
    }

    /// Handles an update request for a service instance.
    #[must_use]
    pub fn update(&self, instance_id: &InstanceId, request: &UpdateRequest) -> Reply {
        let service = match self.route(request) {
            Ok(service) => service,
            Err(reply) => return reply,
        };
        if !service.offering().plan_updateable {
            return Reply::from_error(&ServiceError::NotUpdatable(
                request.service_id.as_str().to_string(),
            ));
        }
        let Some(handler) = service.handlers().update() else {
            return Reply::from_error(&ServiceError::NotUpdatable(
                request.service_id.as_str().to_string(),
            ));
        };
        match handler.update(instance_id, request) {
            Ok(()) => Reply::empty(200),
            Err(err) => Reply::from_error(&err),
        }
    }

    /// Handles a bind request for a service binding.
    #[must_use]
    pub fn bind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        request: &BindRequest,
    ) -> Reply {
        let service = match self.route(request) {
            Ok(service) => service,
            Err(reply) => return reply,
        };
        let Some(handler) = service.handlers().bind() else {
            return Reply::from_error(&ServiceError::NotFound(format!(
                "service {} is not bindable",
                request.service_id
            )));
        };
        match handler.bind(instance_id, binding_id, request) {
            Ok(outcome) => {
                let status = if outcome.created { 201 } else { 200 };
                let body = BindResponse {
                    credentials: outcome.credentials,
                    syslog_drain_url: outcome.syslog_drain_url,
                    route_service_url: outcome.route_service_url,
                };
                Reply::new(status, json_body(&body))
            }
            Err(err) => Reply::from_error(&err),
        }
    }

    /// Handles an unbind request for a service binding.
    #[must_use]
    pub fn unbind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        request: &UnbindRequest,
    ) -> Reply {
        let service = match self.route(request) {
            Ok(service) => service,
            Err(reply) => return reply,
        };
        let Some(handler) = service.handlers().unbind() else {
            // Nothing can be bound to an unbindable service; report gone so
            // the orchestrator converges.
            return Reply::from_error(&ServiceError::Gone);
        };
        match handler.unbind(instance_id, binding_id, request) {
            Ok(()) => Reply::empty(200),
            Err(err) => Reply::from_error(&err),
        }
    }

    /// Handles a deprovision request for a service instance.
    #[must_use]
    pub fn deprovision(&self, instance_id: &InstanceId, request: &DeprovisionRequest) -> Reply {
        let service = match self.route(request) {
            Ok(service) => service,
            Err(reply) => return reply,
        };
        match service.handlers().deprovision().deprovision(instance_id, request) {
            Ok(()) => Reply::empty(200),
            Err(err) => Reply::from_error(&err),
        }
    }

    /// Resolves the registry entry for a request, failing fast on unknown ids.
    fn route<R: Routed>(&self, request: &R) -> Result<&RegisteredService, Reply> {
        self.registry.resolve(request.service_id()).map_err(|err| Reply::from_error(&err))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requests that carry a routable service identifier.
trait Routed {
    /// Returns the service identifier to route by.
    fn service_id(&self) -> &portico_core::ServiceId;
}

impl Routed for ProvisionRequest {
    fn service_id(&self) -> &portico_core::ServiceId {
        &self.service_id
    }
}

impl Routed for UpdateRequest {
    fn service_id(&self) -> &portico_core::ServiceId {
        &self.service_id
    }
}

impl Routed for BindRequest {
    fn service_id(&self) -> &portico_core::ServiceId {
        &self.service_id
    }
}

impl Routed for UnbindRequest {
    fn service_id(&self) -> &portico_core::ServiceId {
        &self.service_id
    }
}

impl Routed for DeprovisionRequest {
    fn service_id(&self) -> &portico_core::ServiceId {
        &self.service_id
    }
}

/// Serializes a success body, degrading to an empty object on failure.
fn json_body<T: serde::Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or_else(|_| json!({}))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
