// crates/portico-core/src/lib.rs
// ============================================================================
// Module: Portico Core Library
// Description: Public API surface for the Portico broker engine core.
// Purpose: Expose catalog types, lifecycle messages, and backend interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Portico core provides the catalog model, lifecycle request and response
//! types, and the backend-agnostic interfaces the broker engine dispatches
//! through. It is transport-agnostic and integrates with provisioning
//! backends and the platform orchestrator through explicit interfaces only.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::BindHandler;
pub use interfaces::DeprovisionHandler;
pub use interfaces::DirectoryError;
pub use interfaces::InstanceTracker;
pub use interfaces::OrchestratorDirectory;
pub use interfaces::Page;
pub use interfaces::PageCursor;
pub use interfaces::ProvisionHandler;
pub use interfaces::RemoteBinding;
pub use interfaces::RemoteInstance;
pub use interfaces::ServiceError;
pub use interfaces::TrackerError;
pub use interfaces::UnbindHandler;
pub use interfaces::UpdateHandler;
