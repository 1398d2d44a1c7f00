// crates/portico-server/tests/lifecycle_api.rs
// ============================================================================
// Module: Lifecycle API Integration Tests
// Description: End-to-end HTTP coverage for the broker surface.
// Purpose: Validate auth, catalog, and the full lifecycle over a real socket.
// Dependencies: portico-server, axum, reqwest, tokio
// ============================================================================

//! ## Overview
//! Serves the broker router on an ephemeral listener backed by an in-memory
//! provisioning backend and drives the full lifecycle with a real HTTP
//! client: provision, bind, unbind, deprovision, idempotent retries, and
//! gone semantics.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use portico_broker::Dispatcher;
use portico_broker::HandlerSet;
use portico_broker::ServiceRegistry;
use portico_core::BindHandler;
use portico_core::BindOutcome;
use portico_core::BindRequest;
use portico_core::BindingId;
use portico_core::DeprovisionHandler;
use portico_core::DeprovisionRequest;
use portico_core::InstanceId;
use portico_core::Plan;
use portico_core::PlanId;
use portico_core::ProvisionHandler;
use portico_core::ProvisionOutcome;
use portico_core::ProvisionRequest;
use portico_core::Service;
use portico_core::ServiceError;
use portico_core::ServiceId;
use portico_core::UnbindHandler;
use portico_core::UnbindRequest;
use portico_server::BrokerCredentials;
use portico_server::NoopAuditSink;
use portico_server::ServerState;
use portico_server::router;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: In-Memory Backend
// ============================================================================

/// Provisioning backend keeping instances and bindings in memory.
#[derive(Clone, Default)]
struct MemoryBackend {
    instances: Arc<Mutex<BTreeSet<String>>>,
    bindings: Arc<Mutex<BTreeSet<(String, String)>>>,
}

impl ProvisionHandler for MemoryBackend {
    fn provision(
        &self,
        instance_id: &InstanceId,
        _request: &ProvisionRequest,
    ) -> Result<ProvisionOutcome, ServiceError> {
        let created = self.instances.lock().unwrap().insert(instance_id.as_str().to_string());
        Ok(ProvisionOutcome {
            created,
            dashboard_url: None,
        })
    }
}

impl BindHandler for MemoryBackend {
    fn bind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        _request: &BindRequest,
    ) -> Result<BindOutcome, ServiceError> {
        if !self.instances.lock().unwrap().contains(instance_id.as_str()) {
            return Err(ServiceError::NotFound(format!("unknown instance: {instance_id}")));
        }
        let created = self
            .bindings
            .lock()
            .unwrap()
            .insert((instance_id.as_str().to_string(), binding_id.as_str().to_string()));
        Ok(BindOutcome {
            created,
            credentials: json!({ "username": "svc", "password": "hunter2" }),
            syslog_drain_url: None,
            route_service_url: None,
        })
    }
}

impl UnbindHandler for MemoryBackend {
    fn unbind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        _request: &UnbindRequest,
    ) -> Result<(), ServiceError> {
        let removed = self
            .bindings
            .lock()
            .unwrap()
            .remove(&(instance_id.as_str().to_string(), binding_id.as_str().to_string()));
        if removed { Ok(()) } else { Err(ServiceError::Gone) }
    }
}

impl DeprovisionHandler for MemoryBackend {
    fn deprovision(
        &self,
        instance_id: &InstanceId,
        _request: &DeprovisionRequest,
    ) -> Result<(), ServiceError> {
        let removed = self.instances.lock().unwrap().remove(instance_id.as_str());
        if removed { Ok(()) } else { Err(ServiceError::Gone) }
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

fn offering() -> Service {
    Service {
        id: ServiceId::new("db"),
        name: "db".to_string(),
        description: "relational database service".to_string(),
        bindable: true,
        plan_updateable: false,
        tags: vec!["relational".to_string()],
        metadata: BTreeMap::new(),
        requires: Vec::new(),
        plans: vec![Plan {
            id: PlanId::new("small"),
            name: "small".to_string(),
            description: "small plan".to_string(),
            free: true,
            metadata: BTreeMap::new(),
        }],
        dashboard_client: None,
    }
}

/// Serves the broker on an ephemeral port, returning its address and a
/// shutdown sender.
async fn serve_broker() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let backend = MemoryBackend::default();
    let handlers = HandlerSet::builder()
        .provision(backend.clone())
        .bind(backend.clone())
        .unbind(backend.clone())
        .deprovision(backend)
        .build()
        .expect("handler set");
    let registry = ServiceRegistry::builder()
        .register(offering(), handlers)
        .expect("registration")
        .build();
    let state = Arc::new(ServerState::new(
        Dispatcher::new(Arc::new(registry)),
        BrokerCredentials::new("broker", "secret"),
        Arc::new(NoopAuditSink),
        256 * 1024,
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("listener");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            router(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .await;
    });
    (addr, shutdown_tx)
}

fn provision_body() -> Value {
    json!({
        "service_id": "db",
        "plan_id": "small",
        "organization_guid": "org-guid",
        "space_guid": "space-guid",
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn catalog_requires_credentials_and_lists_services() {
    let (addr, shutdown) = serve_broker().await;
    let client = reqwest::Client::new();

    let denied = client
        .get(format!("http://{addr}/v2/catalog"))
        .send()
        .await
        .expect("unauthenticated request");
    assert_eq!(denied.status().as_u16(), 401);
    assert!(denied.headers().contains_key("www-authenticate"));

    let allowed = client
        .get(format!("http://{addr}/v2/catalog"))
        .basic_auth("broker", Some("secret"))
        .send()
        .await
        .expect("authenticated request");
    assert_eq!(allowed.status().as_u16(), 200);
    let body: Value = allowed.json().await.expect("catalog body");
    assert_eq!(body["services"][0]["id"], json!("db"));
    assert_eq!(body["services"][0]["plans"][0]["id"], json!("small"));

    let wrong_method = client
        .post(format!("http://{addr}/v2/catalog"))
        .basic_auth("broker", Some("secret"))
        .send()
        .await
        .expect("post request");
    assert_eq!(wrong_method.status().as_u16(), 405);

    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_round_trip() {
    let (addr, shutdown) = serve_broker().await;
    let client = reqwest::Client::new();
    let instance_url = format!("http://{addr}/v2/service_instances/X");
    let binding_url = format!("http://{addr}/v2/service_instances/X/service_bindings/B");
    let delete_query = [("service_id", "db"), ("plan_id", "small")];

    let provisioned = client
        .put(&instance_url)
        .basic_auth("broker", Some("secret"))
        .json(&provision_body())
        .send()
        .await
        .expect("provision");
    assert_eq!(provisioned.status().as_u16(), 201);
    assert_eq!(provisioned.json::<Value>().await.expect("body"), json!({}));

    // Orchestrator retry after timeout: the handler reports "already existed".
    let replayed = client
        .put(&instance_url)
        .basic_auth("broker", Some("secret"))
        .json(&provision_body())
        .send()
        .await
        .expect("provision replay");
    assert_eq!(replayed.status().as_u16(), 200);

    let bound = client
        .put(&binding_url)
        .basic_auth("broker", Some("secret"))
        .json(&json!({ "service_id": "db", "plan_id": "small", "app_guid": "app-guid" }))
        .send()
        .await
        .expect("bind");
    assert_eq!(bound.status().as_u16(), 201);
    let credentials: Value = bound.json().await.expect("binding body");
    assert_eq!(credentials["credentials"]["username"], json!("svc"));

    let unbound = client
        .delete(&binding_url)
        .basic_auth("broker", Some("secret"))
        .query(&delete_query)
        .send()
        .await
        .expect("unbind");
    assert_eq!(unbound.status().as_u16(), 200);
    assert_eq!(unbound.json::<Value>().await.expect("body"), json!({}));

    let unbound_again = client
        .delete(&binding_url)
        .basic_auth("broker", Some("secret"))
        .query(&delete_query)
        .send()
        .await
        .expect("unbind replay");
    assert_eq!(unbound_again.status().as_u16(), 410);
    assert_eq!(unbound_again.json::<Value>().await.expect("body"), json!({}));

    let deprovisioned = client
        .delete(&instance_url)
        .basic_auth("broker", Some("secret"))
        .query(&delete_query)
        .send()
        .await
        .expect("deprovision");
    assert_eq!(deprovisioned.status().as_u16(), 200);

    let deprovisioned_again = client
        .delete(&instance_url)
        .basic_auth("broker", Some("secret"))
        .query(&delete_query)
        .send()
        .await
        .expect("deprovision replay");
    assert_eq!(deprovisioned_again.status().as_u16(), 410);

    let _ = shutdown.send(());
}

#[tokio::test(flavor = "multi_thread")]
async fn unroutable_service_id_yields_404_description() {
    let (addr, shutdown) = serve_broker().await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("http://{addr}/v2/service_instances/X"))
        .basic_auth("broker", Some("secret"))
        .json(&json!({
            "service_id": "ghost",
            "plan_id": "small",
            "organization_guid": "org-guid",
            "space_guid": "space-guid",
        }))
        .send()
        .await
        .expect("provision");
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.expect("body");
    assert!(body["description"].is_string());

    let _ = shutdown.send(());
}
