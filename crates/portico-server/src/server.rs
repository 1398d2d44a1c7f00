// crates/portico-server/src/server.rs
// ============================================================================
// Module: Broker HTTP Server
// Description: Axum surface exposing the versioned lifecycle protocol.
// Purpose: Route, authenticate, and decode requests for the dispatcher.
// Dependencies: portico-broker, portico-config, axum, tokio
// ============================================================================

//! ## Overview
//! The HTTP layer is deliberately thin: it authenticates every request,
//! decodes wire payloads, delegates to the [`Dispatcher`], and serializes the
//! dispatcher's reply verbatim. All protocol decisions (status codes,
//! idempotency, error bodies) live in the dispatcher; the handlers here never
//! synthesize their own lifecycle responses. The advisory
//! `X-Broker-Api-Version` header is recorded in audit events and never
//! enforced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::put;
use portico_broker::Dispatcher;
use portico_broker::Reply;
use portico_config::PorticoConfig;
use portico_core::BindRequest;
use portico_core::BindingId;
use portico_core::DeprovisionRequest;
use portico_core::InstanceId;
use portico_core::PlanId;
use portico_core::ProvisionRequest;
use portico_core::ServiceId;
use portico_core::UnbindRequest;
use portico_core::UpdateRequest;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::audit::RequestAuditEvent;
use crate::audit::RequestAuditSink;
use crate::auth::AuthError;
use crate::auth::BrokerCredentials;
use crate::auth::authorize_basic;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Advisory protocol-version header sent by the orchestrator.
pub const API_VERSION_HEADER: &str = "x-broker-api-version";
/// Protocol major version this broker speaks.
const SUPPORTED_API_MAJOR: &str = "2";
/// Challenge returned with unauthenticated responses.
const BASIC_CHALLENGE: &str = "Basic realm=\"portico\"";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Broker server errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is missing or invalid.
    #[error("server config error: {0}")]
    Config(String),
    /// Transport-level failure while binding or serving.
    #[error("server transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state behind every request handler.
///
/// # Invariants
/// - Immutable after construction; handlers never mutate it.
pub struct ServerState {
    /// Protocol dispatcher over the service registry.
    dispatcher: Dispatcher,
    /// Operator-configured broker credentials.
    credentials: BrokerCredentials,
    /// Sink for request audit events.
    audit: Arc<dyn RequestAuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl ServerState {
    /// Creates server state from its parts.
    #[must_use]
    pub fn new(
        dispatcher: Dispatcher,
        credentials: BrokerCredentials,
        audit: Arc<dyn RequestAuditSink>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            dispatcher,
            credentials,
            audit,
            max_body_bytes,
        }
    }
}

// ============================================================================
// SECTION: Broker Server
// ============================================================================

/// Broker HTTP server instance.
pub struct BrokerServer {
    /// Shared handler state.
    state: Arc<ServerState>,
    /// Socket address to listen on.
    bind: SocketAddr,
}

impl BrokerServer {
    /// Builds a broker server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the configuration fails
    /// validation or the bind address does not parse.
    pub fn from_config(
        config: &PorticoConfig,
        dispatcher: Dispatcher,
        audit: Arc<dyn RequestAuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind: SocketAddr = config
            .server
            .bind
            .parse()
            .map_err(|_| ServerError::Config("invalid bind address".to_string()))?;
        let auth = config
            .server
            .auth
            .as_ref()
            .ok_or_else(|| ServerError::Config("server.auth is required".to_string()))?;
        let credentials = BrokerCredentials::new(auth.username.clone(), auth.password.clone());
        let state = Arc::new(ServerState::new(
            dispatcher,
            credentials,
            audit,
            config.server.max_body_bytes,
        ));
        Ok(Self {
            state,
            bind,
        })
    }

    /// Serves broker requests until the server fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("bind failed: {err}")))?;
        axum::serve(
            listener,
            router(Arc::clone(&self.state)).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|err| ServerError::Transport(format!("server failed: {err}")))
    }
}

/// Builds the broker route table over shared state.
#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/v2/catalog", get(handle_catalog))
        .route(
            "/v2/service_instances/{instance_id}",
            put(handle_provision).patch(handle_update).delete(handle_deprovision),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}",
            put(handle_bind).delete(handle_unbind),
        )
        .with_state(state)
}

// ============================================================================
// SECTION: Request Scope
// ============================================================================

/// Per-request audit context threaded through a handler.
struct RequestScope {
    /// Lifecycle operation label.
    operation: &'static str,
    /// Advisory protocol-version header, verbatim.
    api_version: Option<String>,
    /// Peer IP address.
    peer_ip: String,
    /// Service identifier once routed.
    service_id: Option<String>,
    /// Instance identifier from the path.
    instance_id: Option<String>,
    /// Binding identifier from the path.
    binding_id: Option<String>,
}

impl RequestScope {
    /// Builds a scope from request headers and peer metadata.
    fn new(operation: &'static str, peer: SocketAddr, headers: &HeaderMap) -> Self {
        Self {
            operation,
            api_version: api_version(headers),
            peer_ip: peer.ip().to_string(),
            service_id: None,
            instance_id: None,
            binding_id: None,
        }
    }

    /// Records the instance identifier.
    fn instance(mut self, instance_id: &str) -> Self {
        self.instance_id = Some(instance_id.to_string());
        self
    }

    /// Records the binding identifier.
    fn binding(mut self, binding_id: &str) -> Self {
        self.binding_id = Some(binding_id.to_string());
        self
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles catalog requests.
async fn handle_catalog(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let scope = RequestScope::new("catalog", peer, &headers);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let catalog = state.dispatcher.catalog();
    let reply = Reply::new(200, serde_json::to_value(&catalog).unwrap_or_else(|_| json!({})));
    finish(&state, scope, reply)
}

/// Handles instance provision requests.
async fn handle_provision(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(instance_id): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let mut scope = RequestScope::new("provision", peer, &headers).instance(&instance_id);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let request: ProvisionRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(reply) => return finish(&state, scope, reply),
    };
    scope.service_id = Some(request.service_id.as_str().to_string());
    let reply = state.dispatcher.provision(&InstanceId::new(instance_id), &request);
    finish(&state, scope, reply)
}

/// Handles instance update requests.
async fn handle_update(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(instance_id): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let mut scope = RequestScope::new("update", peer, &headers).instance(&instance_id);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let request: UpdateRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(reply) => return finish(&state, scope, reply),
    };
    scope.service_id = Some(request.service_id.as_str().to_string());
    let reply = state.dispatcher.update(&InstanceId::new(instance_id), &request);
    finish(&state, scope, reply)
}

/// Handles instance deprovision requests.
async fn handle_deprovision(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(instance_id): Path<String>,
    Query(query): Query<DeleteQuery>,
    headers: HeaderMap,
) -> Response {
    let mut scope = RequestScope::new("deprovision", peer, &headers).instance(&instance_id);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let (service_id, plan_id) = match query.require() {
        Ok(parts) => parts,
        Err(reply) => return finish(&state, scope, reply),
    };
    scope.service_id = Some(service_id.as_str().to_string());
    let request = DeprovisionRequest {
        service_id,
        plan_id,
    };
    let reply = state.dispatcher.deprovision(&InstanceId::new(instance_id), &request);
    finish(&state, scope, reply)
}

/// Handles binding creation requests.
async fn handle_bind(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let mut scope =
        RequestScope::new("bind", peer, &headers).instance(&instance_id).binding(&binding_id);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let request: BindRequest = match parse_body(&state, &bytes) {
        Ok(request) => request,
        Err(reply) => return finish(&state, scope, reply),
    };
    scope.service_id = Some(request.service_id.as_str().to_string());
    let reply = state.dispatcher.bind(
        &InstanceId::new(instance_id),
        &BindingId::new(binding_id),
        &request,
    );
    finish(&state, scope, reply)
}

/// Handles binding removal requests.
async fn handle_unbind(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
    headers: HeaderMap,
) -> Response {
    let mut scope =
        RequestScope::new("unbind", peer, &headers).instance(&instance_id).binding(&binding_id);
    if let Err(err) = authorize(&state, &headers) {
        return deny(&state, scope, &err);
    }
    let (service_id, plan_id) = match query.require() {
        Ok(parts) => parts,
        Err(reply) => return finish(&state, scope, reply),
    };
    scope.service_id = Some(service_id.as_str().to_string());
    let request = UnbindRequest {
        service_id,
        plan_id,
    };
    let reply = state.dispatcher.unbind(
        &InstanceId::new(instance_id),
        &BindingId::new(binding_id),
        &request,
    );
    finish(&state, scope, reply)
}

// ============================================================================
// SECTION: Wire Helpers
// ============================================================================

/// Delete-call query parameters, validated after extraction.
#[derive(Debug, Default, Deserialize)]
struct DeleteQuery {
    /// Catalog service identifier.
    service_id: Option<String>,
    /// Catalog plan identifier.
    plan_id: Option<String>,
}

impl DeleteQuery {
    /// Requires both delete parameters to be present.
    fn require(self) -> Result<(ServiceId, PlanId), Reply> {
        let service_id = self.service_id.ok_or_else(|| {
            Reply::new(400, json!({ "description": "missing query parameter: service_id" }))
        })?;
        let plan_id = self.plan_id.ok_or_else(|| {
            Reply::new(400, json!({ "description": "missing query parameter: plan_id" }))
        })?;
        Ok((ServiceId::new(service_id), PlanId::new(plan_id)))
    }
}

/// Authorizes a request against the configured broker credentials.
fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), AuthError> {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    authorize_basic(&state.credentials, header)
}

/// Reads the advisory protocol-version header.
fn api_version(headers: &HeaderMap) -> Option<String> {
    headers.get(API_VERSION_HEADER).and_then(|value| value.to_str().ok()).map(str::to_string)
}

/// Returns an advisory note when the protocol version looks unfamiliar.
fn version_advisory(api_version: Option<&str>) -> Option<String> {
    let version = api_version?;
    let major = version.split('.').next().unwrap_or_default();
    if major == SUPPORTED_API_MAJOR {
        return None;
    }
    Some(format!("unrecognized broker api version: {version}"))
}

/// Parses and bounds a JSON request body.
fn parse_body<T: DeserializeOwned>(state: &ServerState, bytes: &Bytes) -> Result<T, Reply> {
    if bytes.len() > state.max_body_bytes {
        return Err(Reply::new(413, json!({ "description": "request body too large" })));
    }
    serde_json::from_slice(bytes.as_ref()).map_err(|err| {
        Reply::new(400, json!({ "description": format!("malformed request body: {err}") }))
    })
}

/// Records the audit event and renders the dispatcher reply.
fn finish(state: &ServerState, scope: RequestScope, reply: Reply) -> Response {
    let detail = version_advisory(scope.api_version.as_deref());
    state.audit.record(&RequestAuditEvent {
        event: "broker_request",
        operation: scope.operation,
        service_id: scope.service_id,
        instance_id: scope.instance_id,
        binding_id: scope.binding_id,
        status: reply.status,
        api_version: scope.api_version,
        peer_ip: Some(scope.peer_ip),
        detail,
    });
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(reply.body)).into_response()
}

/// Records the audit event for a denied request and challenges the caller.
fn deny(state: &ServerState, scope: RequestScope, error: &AuthError) -> Response {
    state.audit.record(&RequestAuditEvent {
        event: "broker_request",
        operation: scope.operation,
        service_id: scope.service_id,
        instance_id: scope.instance_id,
        binding_id: scope.binding_id,
        status: 401,
        api_version: scope.api_version,
        peer_ip: Some(scope.peer_ip),
        detail: Some(error.to_string()),
    });
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, BASIC_CHALLENGE)],
        axum::Json(json!({ "description": error.to_string() })),
    )
        .into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
