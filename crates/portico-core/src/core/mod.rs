// crates/portico-core/src/core/mod.rs
// ============================================================================
// Module: Portico Core Types
// Description: Canonical catalog and lifecycle message structures.
// Purpose: Provide stable, serializable types for the broker wire protocol.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the advertised catalog and the lifecycle request and
//! response payloads exchanged with the orchestrator. These types are the
//! canonical source of truth for the HTTP surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod identifiers;
pub mod lifecycle;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::Catalog;
pub use catalog::DashboardClient;
pub use catalog::Permission;
pub use catalog::Plan;
pub use catalog::Service;
pub use identifiers::BindingId;
pub use identifiers::InstanceId;
pub use identifiers::PlanId;
pub use identifiers::ServiceId;
pub use lifecycle::BindOutcome;
pub use lifecycle::BindRequest;
pub use lifecycle::BindResource;
pub use lifecycle::BindResponse;
pub use lifecycle::DeprovisionRequest;
pub use lifecycle::PreviousValues;
pub use lifecycle::ProvisionOutcome;
pub use lifecycle::ProvisionRequest;
pub use lifecycle::ProvisionResponse;
pub use lifecycle::UnbindRequest;
pub use lifecycle::UpdateRequest;
