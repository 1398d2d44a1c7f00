// crates/portico-core/src/interfaces/mod.rs
// ============================================================================
// Module: Portico Interfaces
// Description: Backend-agnostic interfaces for provisioning and reconciliation.
// Purpose: Define the contract surfaces between the broker engine and its collaborators.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the broker engine integrates with the provisioning
//! backend and the platform orchestrator without embedding backend-specific
//! details. Handler implementations perform the actual resource work; the
//! optional [`InstanceTracker`] capability opts a backend into orphan
//! reconciliation; [`OrchestratorDirectory`] is the paged view of the
//! orchestrator's authoritative records. Implementations must be
//! deterministic and fail closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::identifiers::BindingId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::PlanId;
use crate::core::lifecycle::BindOutcome;
use crate::core::lifecycle::BindRequest;
use crate::core::lifecycle::DeprovisionRequest;
use crate::core::lifecycle::ProvisionOutcome;
use crate::core::lifecycle::ProvisionRequest;
use crate::core::lifecycle::UnbindRequest;
use crate::core::lifecycle::UpdateRequest;

// ============================================================================
// SECTION: Service Errors
// ============================================================================

/// Domain errors a lifecycle handler may return.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`ServiceError::http_status`] is the single source of wire status codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Requested service, plan, or resource is unknown.
    #[error("not found: {0}")]
    NotFound(String),
    /// Resource already exists with conflicting attributes.
    #[error("resource conflict")]
    Conflict,
    /// Resource to delete is already gone.
    #[error("resource gone")]
    Gone,
    /// Service does not support updates.
    #[error("service is not updatable: {0}")]
    NotUpdatable(String),
    /// Service does not support bindings.
    #[error("service is not bindable: {0}")]
    NotBindable(String),
    /// Handler-declared failure with an explicit wire status.
    #[error("broker failure ({status}): {message}")]
    Broker {
        /// HTTP status code to surface verbatim.
        status: u16,
        /// Human-readable failure description.
        message: String,
    },
    /// Any other handler failure.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ServiceError {
    /// Returns the HTTP status code for the error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict => 409,
            Self::Gone => 410,
            Self::NotUpdatable(_) | Self::NotBindable(_) => 422,
            Self::Broker {
                status, ..
            } => *status,
            Self::Unexpected(_) => 500,
        }
    }
}

// ============================================================================
// SECTION: Lifecycle Handlers
// ============================================================================

/// Handler for provisioning new service instances.
pub trait ProvisionHandler: Send + Sync {
    /// Provisions the instance, reporting whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when provisioning fails.
    fn provision(
        &self,
        instance_id: &InstanceId,
        request: &ProvisionRequest,
    ) -> Result<ProvisionOutcome, ServiceError>;
}

/// Handler for updating existing service instances.
pub trait UpdateHandler: Send + Sync {
    /// Applies a plan or parameter update to the instance.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the update fails.
    fn update(&self, instance_id: &InstanceId, request: &UpdateRequest)
    -> Result<(), ServiceError>;
}

/// Handler for creating service bindings.
pub trait BindHandler: Send + Sync {
    /// Creates the binding, reporting whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when binding fails.
    fn bind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        request: &BindRequest,
    ) -> Result<BindOutcome, ServiceError>;
}

/// Handler for removing service bindings.
pub trait UnbindHandler: Send + Sync {
    /// Removes the binding.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Gone`] when the binding no longer exists, or
    /// another [`ServiceError`] when removal fails.
    fn unbind(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
        request: &UnbindRequest,
    ) -> Result<(), ServiceError>;
}

/// Handler for deprovisioning service instances.
pub trait DeprovisionHandler: Send + Sync {
    /// Destroys the instance.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Gone`] when the instance no longer exists, or
    /// another [`ServiceError`] when deprovisioning fails.
    fn deprovision(
        &self,
        instance_id: &InstanceId,
        request: &DeprovisionRequest,
    ) -> Result<(), ServiceError>;
}

// ============================================================================
// SECTION: Instance Tracker
// ============================================================================

/// Instance tracker errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Tracker reported an error.
    #[error("tracker error: {0}")]
    Tracker(String),
}

/// Optional bookkeeping capability a provisioning backend may expose.
///
/// Backends that do not track state return `Ok(None)` from the listing
/// methods, which opts them out of reconciliation entirely.
pub trait InstanceTracker: Send + Sync {
    /// Returns the instance identifiers the backend believes exist.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] when the listing fails.
    fn known_instance_ids(&self) -> Result<Option<BTreeSet<InstanceId>>, TrackerError>;

    /// Returns the binding identifiers the backend believes exist for an instance.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] when the listing fails.
    fn known_binding_ids(
        &self,
        instance_id: &InstanceId,
    ) -> Result<Option<BTreeSet<BindingId>>, TrackerError>;

    /// Forgets and cleans up an instance the orchestrator no longer references.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] when cleanup fails.
    fn remove_orphaned_instance(&self, instance_id: &InstanceId) -> Result<(), TrackerError>;

    /// Forgets and cleans up a binding the orchestrator no longer references.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] when cleanup fails.
    fn remove_orphaned_binding(
        &self,
        instance_id: &InstanceId,
        binding_id: &BindingId,
    ) -> Result<(), TrackerError>;
}

// ============================================================================
// SECTION: Orchestrator Directory
// ============================================================================

/// Orchestrator directory errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport failure while fetching a page.
    #[error("directory transport error: {0}")]
    Transport(String),
    /// Page payload could not be decoded.
    #[error("directory decode error: {0}")]
    Decode(String),
}

/// Opaque cursor positioning a paged directory listing.
///
/// # Invariants
/// - Cursors are only meaningful to the directory that issued them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Creates a cursor from its opaque wire value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the opaque cursor value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a directory listing.
///
/// # Invariants
/// - `next` is `None` on the final page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records on this page.
    pub resources: Vec<T>,
    /// Cursor for the following page, when more records exist.
    pub next: Option<PageCursor>,
}

/// Orchestrator record of a service instance.
///
/// # Invariants
/// - `broker_instance_id` is the correlation field embedded in the record's
///   gateway metadata; records without it cannot be matched to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInstance {
    /// GUID of the orchestrator's own record.
    pub resource_guid: String,
    /// Broker instance identifier embedded in the record, when present.
    pub broker_instance_id: Option<InstanceId>,
}

/// Orchestrator record of a service binding.
///
/// # Invariants
/// - `broker_binding_id` is the correlation field embedded in the record's
///   gateway metadata; records without it cannot be matched to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBinding {
    /// GUID of the orchestrator's own record.
    pub resource_guid: String,
    /// Broker binding identifier embedded in the record, when present.
    pub broker_binding_id: Option<BindingId>,
}

/// Paged view of the orchestrator's authoritative resource records.
///
/// A fresh listing always restarts from the first page; cursors cannot be
/// reused across listings.
pub trait OrchestratorDirectory: Send + Sync {
    /// Lists the orchestrator's instance records for a plan.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the page cannot be fetched or decoded.
    fn instances_for_plan(
        &self,
        plan_id: &PlanId,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteInstance>, DirectoryError>;

    /// Lists the orchestrator's binding records for an instance record.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the page cannot be fetched or decoded.
    fn bindings_for_instance(
        &self,
        instance_guid: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteBinding>, DirectoryError>;
}
