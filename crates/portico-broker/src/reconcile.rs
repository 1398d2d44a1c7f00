// crates/portico-broker/src/reconcile.rs
// ============================================================================
// Module: Orphan Reconciliation Engine
// Description: Periodic diff of local bookkeeping against orchestrator records.
// Purpose: Remove broker-side orphans without ever touching orchestrator data.
// Dependencies: portico-core, tokio, time, serde_json
// ============================================================================

//! ## Overview
//! The sweeper periodically snapshots the instance identifiers a backend
//! believes exist and the orchestrator's authoritative paged records, then
//! removes broker-side state the orchestrator no longer references. Records
//! the orchestrator holds that the broker never claimed are logged as
//! warnings only; the engine never invents deletions against orchestrator
//! data. A failed page fetch aborts the whole sweep attempt: a partial
//! remote snapshot is indistinguishable from mass orphaning.
//! Invariants:
//! - Only identifiers absent from the complete remote snapshot are orphan
//!   candidates.
//! - A candidate must stay orphaned for the configured grace period before
//!   any removal call is issued.
//! - One item's cleanup failure never aborts the sweep or affects other items.
//! - Backends reporting an untracked state are skipped entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use portico_core::BindingId;
use portico_core::DirectoryError;
use portico_core::InstanceId;
use portico_core::InstanceTracker;
use portico_core::OrchestratorDirectory;
use portico_core::PageCursor;
use portico_core::ServiceId;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;

use crate::registry::RegisteredService;
use crate::registry::ServiceRegistry;

// ============================================================================
// SECTION: Sweep Errors
// ============================================================================

/// Errors aborting a whole sweep attempt.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Orchestrator directory page fetch failed.
    #[error("sweep aborted by directory failure: {0}")]
    Directory(#[from] DirectoryError),
}

// ============================================================================
// SECTION: Sweep Report
// ============================================================================

/// Counters summarizing one completed sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Orphaned instances removed from the backend.
    pub instances_removed: usize,
    /// Orphaned bindings removed from the backend.
    pub bindings_removed: usize,
    /// Cleanup calls that failed and were isolated.
    pub removal_failures: usize,
    /// Local listings that failed and were isolated.
    pub listing_failures: usize,
    /// Orchestrator records the broker never locally claimed.
    pub unknown_remote: usize,
    /// Orphan candidates deferred by the grace period.
    pub skipped_in_grace: usize,
}

// ============================================================================
// SECTION: Sweep Log
// ============================================================================

/// Structured event emitted during sweeps.
///
/// # Invariants
/// - Optional fields are `None` when the context is unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct SweepEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Service the event concerns, when scoped to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<ServiceId>,
    /// Instance the event concerns, when scoped to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    /// Binding the event concerns, when scoped to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_id: Option<BindingId>,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Counters for completed sweeps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
}

impl SweepEvent {
    /// Builds a bare event with the given identifier.
    fn bare(event: &'static str) -> Self {
        Self {
            event,
            service_id: None,
            instance_id: None,
            binding_id: None,
            detail: None,
            report: None,
        }
    }

    /// Builds a sweep-completed event.
    #[must_use]
    pub fn completed(report: SweepReport) -> Self {
        Self {
            report: Some(report),
            ..Self::bare("sweep_completed")
        }
    }

    /// Builds a sweep-aborted event.
    #[must_use]
    pub fn aborted(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::bare("sweep_aborted")
        }
    }

    /// Builds an event for a backend that does not track state.
    #[must_use]
    pub fn skipped_untracked(service_id: &ServiceId) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            ..Self::bare("sweep_skipped_untracked")
        }
    }

    /// Builds an event for a removed orphan instance.
    #[must_use]
    pub fn instance_removed(service_id: &ServiceId, instance_id: &InstanceId) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            instance_id: Some(instance_id.clone()),
            ..Self::bare("orphan_instance_removed")
        }
    }

    /// Builds an event for a removed orphan binding.
    #[must_use]
    pub fn binding_removed(
        service_id: &ServiceId,
        instance_id: &InstanceId,
        binding_id: &BindingId,
    ) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            instance_id: Some(instance_id.clone()),
            binding_id: Some(binding_id.clone()),
            ..Self::bare("orphan_binding_removed")
        }
    }

    /// Builds an event for an isolated cleanup failure.
    #[must_use]
    pub fn removal_failed(
        service_id: &ServiceId,
        instance_id: &InstanceId,
        binding_id: Option<&BindingId>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            instance_id: Some(instance_id.clone()),
            binding_id: binding_id.cloned(),
            detail: Some(detail.into()),
            ..Self::bare("orphan_removal_failed")
        }
    }

    /// Builds an event for an isolated local listing failure.
    #[must_use]
    pub fn listing_failed(
        service_id: &ServiceId,
        instance_id: Option<&InstanceId>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            instance_id: instance_id.cloned(),
            detail: Some(detail.into()),
            ..Self::bare("local_listing_failed")
        }
    }

    /// Builds a warning event for an orchestrator record unknown to the broker.
    #[must_use]
    pub fn remote_unknown(service_id: &ServiceId, detail: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.clone()),
            detail: Some(detail.into()),
            ..Self::bare("remote_unknown")
        }
    }
}

/// Sink for sweep events.
pub trait SweepLog: Send + Sync {
    /// Records a sweep event.
    fn record(&self, event: &SweepEvent);
}

/// Sweep log that writes JSON lines to stderr.
pub struct StderrSweepLog;

impl SweepLog for StderrSweepLog {
    fn record(&self, event: &SweepEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op sweep log.
///
/// # Invariants
/// - Events are intentionally discarded.
pub struct NoopSweepLog;

impl SweepLog for NoopSweepLog {
    fn record(&self, _event: &SweepEvent) {}
}

// ============================================================================
// SECTION: Orphan Sweeper
// ============================================================================

/// Periodic reconciliation engine over the registry's tracked services.
///
/// # Invariants
/// - Holds no state shared with request handling; an in-flight sweep may run
///   concurrently with lifecycle calls.
/// - Pending-orphan ages survive aborted sweeps and reset when a candidate
///   reappears remotely.
pub struct OrphanSweeper {
    /// Immutable routing table listing services, plans, and trackers.
    registry: Arc<ServiceRegistry>,
    /// Paged view of the orchestrator's authoritative records.
    directory: Arc<dyn OrchestratorDirectory>,
    /// Sink for sweep events.
    log: Arc<dyn SweepLog>,
    /// Minimum age before an orphan candidate is removed.
    grace: Duration,
    /// First-seen timestamps for orphaned instance candidates.
    pending_instances: Mutex<BTreeMap<InstanceId, OffsetDateTime>>,
    /// First-seen timestamps for orphaned binding candidates.
    pending_bindings: Mutex<BTreeMap<(InstanceId, BindingId), OffsetDateTime>>,
}

impl OrphanSweeper {
    /// Creates a sweeper over the given registry and directory.
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry>,
        directory: Arc<dyn OrchestratorDirectory>,
        log: Arc<dyn SweepLog>,
        grace: std::time::Duration,
    ) -> Self {
        Self {
            registry,
            directory,
            log,
            grace: Duration::try_from(grace).unwrap_or(Duration::MAX),
            pending_instances: Mutex::new(BTreeMap::new()),
            pending_bindings: Mutex::new(BTreeMap::new()),
        }
    }

    /// Spawns the periodic sweep task.
    ///
    /// The task never finishes on its own; abort its handle on shutdown.
    pub fn spawn(self: Arc<Self>, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let task = Arc::clone(&self);
                let outcome =
                    tokio::task::spawn_blocking(move || task.sweep_at(OffsetDateTime::now_utc()))
                        .await;
                match outcome {
                    Ok(Ok(report)) => self.log.record(&SweepEvent::completed(report)),
                    Ok(Err(err)) => self.log.record(&SweepEvent::aborted(err.to_string())),
                    Err(err) => self.log.record(&SweepEvent::aborted(err.to_string())),
                }
            }
        })
    }

    /// Runs one sweep against the snapshot taken at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] when an orchestrator page fetch fails; no
    /// removal calls are issued for the aborted attempt.
    pub fn sweep_at(&self, now: OffsetDateTime) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();
        let mut instance_candidates = BTreeSet::new();
        let mut binding_candidates = BTreeSet::new();

        for service in self.registry.services() {
            let service_id = &service.offering().id;
            let Some(tracker) = service.handlers().tracker() else {
                self.log.record(&SweepEvent::skipped_untracked(service_id));
                continue;
            };
            let local = match tracker.known_instance_ids() {
                Ok(Some(ids)) => ids,
                Ok(None) => {
                    self.log.record(&SweepEvent::skipped_untracked(service_id));
                    continue;
                }
                Err(err) => {
                    report.listing_failures += 1;
                    self.log.record(&SweepEvent::listing_failed(service_id, None, err.to_string()));
                    continue;
                }
            };

            let remote = self.remote_instances(service, &local, &mut report)?;
            self.sweep_instances(
                service_id,
                tracker,
                &local,
                &remote,
                now,
                &mut report,
                &mut instance_candidates,
            );
            self.sweep_bindings(
                service_id,
                tracker,
                &local,
                &remote,
                now,
                &mut report,
                &mut binding_candidates,
            )?;
        }

        self.prune_pending(&instance_candidates, &binding_candidates);
        Ok(report)
    }

    /// Builds the complete remote instance snapshot for one service.
    fn remote_instances(
        &self,
        service: &RegisteredService,
        local: &BTreeSet<InstanceId>,
        report: &mut SweepReport,
    ) -> Result<BTreeMap<InstanceId, String>, SweepError> {
        let service_id = &service.offering().id;
        let mut remote = BTreeMap::new();
        for plan in &service.offering().plans {
            let mut cursor: Option<PageCursor> = None;
            loop {
                let page = self.directory.instances_for_plan(&plan.id, cursor.as_ref())?;
                for record in page.resources {
                    if let Some(instance_id) = record.broker_instance_id {
                        if !local.contains(&instance_id) {
                            report.unknown_remote += 1;
                            self.log.record(&SweepEvent::remote_unknown(
                                service_id,
                                format!(
                                    "instance {instance_id} (resource {}) unknown to broker",
                                    record.resource_guid
                                ),
                            ));
                        }
                        remote.insert(instance_id, record.resource_guid);
                    } else {
                        report.unknown_remote += 1;
                        self.log.record(&SweepEvent::remote_unknown(
                            service_id,
                            format!("resource {} has no broker correlation", record.resource_guid),
                        ));
                    }
                }
                cursor = page.next;
                if cursor.is_none() {
                    break;
                }
            }
        }
        Ok(remote)
    }

    /// Removes instance orphans that have aged past the grace period.
    #[allow(clippy::too_many_arguments, reason = "Sweep state threads through one pass.")]
    fn sweep_instances(
        &self,
        service_id: &ServiceId,
        tracker: &Arc<dyn InstanceTracker>,
        local: &BTreeSet<InstanceId>,
        remote: &BTreeMap<InstanceId, String>,
        now: OffsetDateTime,
        report: &mut SweepReport,
        candidates: &mut BTreeSet<InstanceId>,
    ) {
        for instance_id in local {
            if remote.contains_key(instance_id) {
                continue;
            }
            let due = {
                let mut pending = lock(&self.pending_instances);
                let first_seen = *pending.entry(instance_id.clone()).or_insert(now);
                now - first_seen >= self.grace
            };
            if !due {
                report.skipped_in_grace += 1;
                candidates.insert(instance_id.clone());
                continue;
            }
            match tracker.remove_orphaned_instance(instance_id) {
                Ok(()) => {
                    report.instances_removed += 1;
                    lock(&self.pending_instances).remove(instance_id);
                    self.log.record(&SweepEvent::instance_removed(service_id, instance_id));
                }
                Err(err) => {
                    report.removal_failures += 1;
                    candidates.insert(instance_id.clone());
                    self.log.record(&SweepEvent::removal_failed(
                        service_id,
                        instance_id,
                        None,
                        err.to_string(),
                    ));
                }
            }
        }
    }

    /// Reconciles bindings for every instance confirmed on both sides.
    #[allow(clippy::too_many_arguments, reason = "Sweep state threads through one pass.")]
    fn sweep_bindings(
        &self,
        service_id: &ServiceId,
        tracker: &Arc<dyn InstanceTracker>,
        local: &BTreeSet<InstanceId>,
        remote: &BTreeMap<InstanceId, String>,
        now: OffsetDateTime,
        report: &mut SweepReport,
        candidates: &mut BTreeSet<(InstanceId, BindingId)>,
    ) -> Result<(), SweepError> {
        for (instance_id, resource_guid) in remote {
            if !local.contains(instance_id) {
                continue;
            }
            let local_bindings = match tracker.known_binding_ids(instance_id) {
                Ok(Some(ids)) => ids,
                Ok(None) => continue,
                Err(err) => {
                    report.listing_failures += 1;
                    self.log.record(&SweepEvent::listing_failed(
                        service_id,
                        Some(instance_id),
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let mut remote_bindings = BTreeSet::new();
            let mut cursor: Option<PageCursor> = None;
            loop {
                let page = self.directory.bindings_for_instance(resource_guid, cursor.as_ref())?;
                for record in page.resources {
                    if let Some(binding_id) = record.broker_binding_id {
                        remote_bindings.insert(binding_id);
                    } else {
                        report.unknown_remote += 1;
                        self.log.record(&SweepEvent::remote_unknown(
                            service_id,
                            format!(
                                "binding resource {} has no broker correlation",
                                record.resource_guid
                            ),
                        ));
                    }
                }
                cursor = page.next;
                if cursor.is_none() {
                    break;
                }
            }

            for binding_id in &local_bindings {
                if remote_bindings.contains(binding_id) {
                    continue;
                }
                let key = (instance_id.clone(), binding_id.clone());
                let due = {
                    let mut pending = lock(&self.pending_bindings);
                    let first_seen = *pending.entry(key.clone()).or_insert(now);
                    now - first_seen >= self.grace
                };
                if !due {
                    report.skipped_in_grace += 1;
                    candidates.insert(key);
                    continue;
                }
                match tracker.remove_orphaned_binding(instance_id, binding_id) {
                    Ok(()) => {
                        report.bindings_removed += 1;
                        lock(&self.pending_bindings).remove(&key);
                        self.log.record(&SweepEvent::binding_removed(
                            service_id,
                            instance_id,
                            binding_id,
                        ));
                    }
                    Err(err) => {
                        report.removal_failures += 1;
                        candidates.insert(key);
                        self.log.record(&SweepEvent::removal_failed(
                            service_id,
                            instance_id,
                            Some(binding_id),
                            err.to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Drops pending entries that are no longer orphan candidates.
    fn prune_pending(
        &self,
        instance_candidates: &BTreeSet<InstanceId>,
        binding_candidates: &BTreeSet<(InstanceId, BindingId)>,
    ) {
        lock(&self.pending_instances).retain(|key, _| instance_candidates.contains(key));
        lock(&self.pending_bindings).retain(|key, _| binding_candidates.contains(key));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a pending map, recovering from poisoning.
fn lock<'a, K: Ord, V>(mutex: &'a Mutex<BTreeMap<K, V>>) -> MutexGuard<'a, BTreeMap<K, V>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
