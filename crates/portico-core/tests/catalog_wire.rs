// crates/portico-core/tests/catalog_wire.rs
// ============================================================================
// Module: Catalog Wire Tests
// Description: Tests for catalog serialization shape and determinism.
// Purpose: Ensure the catalog renders stable, order-preserving JSON.
// Dependencies: portico-core, serde_json, proptest
// ============================================================================
//! ## Overview
//! Validates catalog wire rendering: plan order preservation, omission of
//! absent optional fields, and byte-identical repeated renders.

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

use portico_core::Catalog;
use portico_core::DashboardClient;
use portico_core::Permission;
use portico_core::Plan;
use portico_core::PlanId;
use portico_core::Service;
use portico_core::ServiceId;
use proptest::prelude::any;
use proptest::prelude::proptest;
use serde_json::json;

fn plan(id: &str) -> Plan {
    Plan {
        id: PlanId::new(id),
        name: id.to_string(),
        description: format!("{id} plan"),
        free: true,
        metadata: BTreeMap::new(),
    }
}

fn service(id: &str, plans: Vec<Plan>) -> Service {
    Service {
        id: ServiceId::new(id),
        name: id.to_string(),
        description: format!("{id} service"),
        bindable: true,
        plan_updateable: false,
        tags: Vec::new(),
        metadata: BTreeMap::new(),
        requires: Vec::new(),
        plans,
        dashboard_client: None,
    }
}

/// Plans render in registration order and re-rendering is byte-identical.
#[test]
fn catalog_preserves_plan_order_and_renders_deterministically() {
    let catalog = Catalog {
        services: vec![service("db", vec![plan("p1"), plan("p2")])],
    };

    let first = serde_json::to_string(&catalog).expect("render catalog");
    let second = serde_json::to_string(&catalog).expect("render catalog again");
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).expect("parse rendered catalog");
    let plans = value["services"][0]["plans"].as_array().expect("plans array");
    let ids: Vec<&str> = plans.iter().map(|p| p["id"].as_str().expect("plan id")).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
}

/// Absent optional fields are omitted from the wire shape entirely.
#[test]
fn catalog_omits_absent_optional_fields() {
    let catalog = Catalog {
        services: vec![service("db", vec![plan("p1")])],
    };

    let value = serde_json::to_value(&catalog).expect("render catalog");
    let entry = value["services"][0].as_object().expect("service object");
    assert!(!entry.contains_key("dashboard_client"));
    assert!(!entry.contains_key("metadata"));
    assert!(!entry.contains_key("tags"));
    assert!(!entry.contains_key("requires"));
}

/// Populated optional fields render with stable wire labels.
#[test]
fn catalog_renders_permissions_and_dashboard_client() {
    let mut offering = service("db", vec![plan("p1")]);
    offering.requires = vec![Permission::SyslogDrain, Permission::RouteForwarding];
    offering.dashboard_client = Some(DashboardClient {
        id: "sso-client".to_string(),
        secret: "sso-secret".to_string(),
        redirect_uri: "https://dashboard.example.com/callback".to_string(),
    });

    let value = serde_json::to_value(&Catalog {
        services: vec![offering],
    })
    .expect("render catalog");
    assert_eq!(value["services"][0]["requires"], json!(["syslog_drain", "route_forwarding"]));
    assert_eq!(value["services"][0]["dashboard_client"]["id"], json!("sso-client"));
    assert_eq!(
        value["services"][0]["dashboard_client"]["redirect_uri"],
        json!("https://dashboard.example.com/callback")
    );
}

/// A rendered catalog deserializes back to an equal value.
#[test]
fn catalog_roundtrips_through_json() {
    let mut offering = service("db", vec![plan("p1"), plan("p2")]);
    offering.tags = vec!["relational".to_string()];
    let catalog = Catalog {
        services: vec![offering],
    };

    let rendered = serde_json::to_string(&catalog).expect("render catalog");
    let decoded: Catalog = serde_json::from_str(&rendered).expect("decode catalog");
    assert_eq!(decoded, catalog);
}

proptest! {
    /// Rendering is deterministic for arbitrary name/description content.
    #[test]
    fn catalog_render_is_idempotent(name in any::<String>(), description in any::<String>()) {
        let mut offering = service("db", vec![plan("p1")]);
        offering.name = name;
        offering.description = description;
        let catalog = Catalog { services: vec![offering] };

        let first = serde_json::to_string(&catalog).expect("render catalog");
        let second = serde_json::to_string(&catalog).expect("render catalog again");
        assert_eq!(first, second);
    }
}
