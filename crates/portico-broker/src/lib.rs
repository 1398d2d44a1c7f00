// crates/portico-broker/src/lib.rs
// ============================================================================
// Module: Portico Broker Library
// Description: Service registry, protocol dispatcher, and orphan reconciliation.
// Purpose: Implement the broker engine behind the lifecycle HTTP surface.
// Dependencies: portico-core, tokio, time
// ============================================================================

//! ## Overview
//! Portico broker wires three pieces together: the [`ServiceRegistry`] maps
//! catalog service identifiers to lifecycle handler sets validated at
//! startup; the [`Dispatcher`] translates lifecycle requests into handler
//! invocations and handler results into protocol-correct replies; and the
//! [`OrphanSweeper`] periodically diffs the backend's bookkeeping against the
//! orchestrator's authoritative records, cleaning up the broker's own side
//! only.
//! Invariants:
//! - The registry is immutable once built; steady-state reads need no locking.
//! - The dispatcher performs exactly one handler invocation per request.
//! - Sweeps never delete orchestrator records and never abort on a single
//!   item's cleanup failure.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatch;
pub mod reconcile;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatch::Dispatcher;
pub use dispatch::Reply;
pub use reconcile::NoopSweepLog;
pub use reconcile::OrphanSweeper;
pub use reconcile::StderrSweepLog;
pub use reconcile::SweepError;
pub use reconcile::SweepEvent;
pub use reconcile::SweepLog;
pub use reconcile::SweepReport;
pub use registry::ConfigurationError;
pub use registry::HandlerSet;
pub use registry::HandlerSetBuilder;
pub use registry::RegisteredService;
pub use registry::ServiceRegistry;
pub use registry::ServiceRegistryBuilder;
