// crates/portico-broker/src/registry.rs
// ============================================================================
// Module: Service Registry
// Description: Maps service identifiers to validated lifecycle handler sets.
// Purpose: Fail fast on misconfiguration and route dispatch by service id.
// Dependencies: portico-core, url
// ============================================================================

//! ## Overview
//! The registry is built once at startup from service offerings and their
//! handler sets, then treated as immutable for the life of the broker.
//! Registration validates everything eagerly: duplicate service or plan
//! identifiers, bindable services without bind handlers, non-bindable
//! services with them, and malformed dashboard redirect URIs all fail
//! construction with [`ConfigurationError`] before any request is served.
//! Invariants:
//! - Service identifiers are unique within the registry.
//! - Registration order is preserved for catalog rendering.
//! - A bindable service always carries both bind and unbind handlers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use portico_core::BindHandler;
use portico_core::Catalog;
use portico_core::DeprovisionHandler;
use portico_core::InstanceTracker;
use portico_core::PlanId;
use portico_core::ProvisionHandler;
use portico_core::Service;
use portico_core::ServiceError;
use portico_core::ServiceId;
use portico_core::UnbindHandler;
use portico_core::UpdateHandler;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Errors raised while assembling the registry or a handler set.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Handler set lacks the mandatory provision handler.
    #[error("handler set is missing a provision handler")]
    MissingProvisionHandler,
    /// Handler set lacks the mandatory deprovision handler.
    #[error("handler set is missing a deprovision handler")]
    MissingDeprovisionHandler,
    /// Service identifier is already registered.
    #[error("service id already registered: {0}")]
    DuplicateService(ServiceId),
    /// Plan identifier appears more than once within a service.
    #[error("duplicate plan id {plan_id} within service {service_id}")]
    DuplicatePlan {
        /// Owning service identifier.
        service_id: ServiceId,
        /// Duplicated plan identifier.
        plan_id: PlanId,
    },
    /// Bindable service registered without a bind/unbind handler pair.
    #[error("bindable service {0} requires bind and unbind handlers")]
    MissingBindHandlers(ServiceId),
    /// Non-bindable service registered with bind or unbind handlers.
    #[error("non-bindable service {0} must not register bind handlers")]
    UnexpectedBindHandlers(ServiceId),
    /// Plan-updateable service registered without an update handler.
    #[error("plan-updateable service {0} requires an update handler")]
    MissingUpdateHandler(ServiceId),
    /// Dashboard client redirect URI failed to parse.
    #[error("invalid dashboard redirect uri for service {service_id}: {reason}")]
    InvalidDashboardRedirect {
        /// Owning service identifier.
        service_id: ServiceId,
        /// Parse failure detail.
        reason: String,
    },
}

// ============================================================================
// SECTION: Handler Set
// ============================================================================

/// Builder for a lifecycle handler set.
///
/// # Invariants
/// - `build` succeeds only when provision and deprovision handlers are set.
#[derive(Default)]
pub struct HandlerSetBuilder {
    /// Provision handler, mandatory.
    provision: Option<Arc<dyn ProvisionHandler>>,
    /// Update handler, required only for plan-updateable services.
    update: Option<Arc<dyn UpdateHandler>>,
    /// Bind handler, required only for bindable services.
    bind: Option<Arc<dyn BindHandler>>,
    /// Unbind handler, required only for bindable services.
    unbind: Option<Arc<dyn UnbindHandler>>,
    /// Deprovision handler, mandatory.
    deprovision: Option<Arc<dyn DeprovisionHandler>>,
    /// Optional bookkeeping capability enabling reconciliation.
    tracker: Option<Arc<dyn InstanceTracker>>,
}

impl HandlerSetBuilder {
    /// Registers the provision handler.
    #[must_use]
    pub fn provision(mut self, handler: impl ProvisionHandler + 'static) -> Self {
        self.provision = Some(Arc::new(handler));
        self
    }

    /// Registers the update handler.
    #[must_use]
    pub fn update(mut self, handler: impl UpdateHandler + 'static) -> Self {
        self.update = Some(Arc::new(handler));
        self
    }

    /// Registers the bind handler.
    #[must_use]
    pub fn bind(mut self, handler: impl BindHandler + 'static) -> Self {
        self.bind = Some(Arc::new(handler));
        self
    }

    /// Registers the unbind handler.
    #[must_use]
    pub fn unbind(mut self, handler: impl UnbindHandler + 'static) -> Self {
        self.unbind = Some(Arc::new(handler));
        self
    }

    /// Registers the deprovision handler.
    #[must_use]
    pub fn deprovision(mut self, handler: impl DeprovisionHandler + 'static) -> Self {
        self.deprovision = Some(Arc::new(handler));
        self
    }

    /// Registers the instance tracker capability.
    #[must_use]
    pub fn tracker(mut self, tracker: impl InstanceTracker + 'static) -> Self {
        self.tracker = Some(Arc::new(tracker));
        self
    }

    /// Builds the handler set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a mandatory handler is missing.
    pub fn build(self) -> Result<HandlerSet, ConfigurationError> {
        Ok(HandlerSet {
            provision: self.provision.ok_or(ConfigurationError::MissingProvisionHandler)?,
            update: self.update,
            bind: self.bind,
            unbind: self.unbind,
            deprovision: self.deprovision.ok_or(ConfigurationError::MissingDeprovisionHandler)?,
            tracker: self.tracker,
        })
    }
}

/// Lifecycle handlers implementing one service offering.
///
/// # Invariants
/// - Provision and deprovision handlers are always present.
/// - Handler references are plain data; no runtime discovery is involved.
pub struct HandlerSet {
    /// Provision handler.
    provision: Arc<dyn ProvisionHandler>,
    /// Optional update handler.
    update: Option<Arc<dyn UpdateHandler>>,
    /// Optional bind handler.
    bind: Option<Arc<dyn BindHandler>>,
    /// Optional unbind handler.
    unbind: Option<Arc<dyn UnbindHandler>>,
    /// Deprovision handler.
    deprovision: Arc<dyn DeprovisionHandler>,
    /// Optional bookkeeping capability enabling reconciliation.
    tracker: Option<Arc<dyn InstanceTracker>>,
}

impl HandlerSet {
    /// Returns a builder for a handler set.
    #[must_use]
    pub fn builder() -> HandlerSetBuilder {
        HandlerSetBuilder::default()
    }

    /// Returns the provision handler.
    #[must_use]
    pub fn provision(&self) -> &Arc<dyn ProvisionHandler> {
        &self.provision
    }

    /// Returns the update handler when registered.
    #[must_use]
    pub fn update(&self) -> Option<&Arc<dyn UpdateHandler>> {
        self.update.as_ref()
    }

    /// Returns the bind handler when registered.
    #[must_use]
    pub fn bind(&self) -> Option<&Arc<dyn BindHandler>> {
        self.bind.as_ref()
    }

    /// Returns the unbind handler when registered.
    #[must_use]
    pub fn unbind(&self) -> Option<&Arc<dyn UnbindHandler>> {
        self.unbind.as_ref()
    }

    /// Returns the deprovision handler.
    #[must_use]
    pub fn deprovision(&self) -> &Arc<dyn DeprovisionHandler> {
        &self.deprovision
    }

    /// Returns the instance tracker when the backend exposes one.
    #[must_use]
    pub fn tracker(&self) -> Option<&Arc<dyn InstanceTracker>> {
        self.tracker.as_ref()
    }
}

// ============================================================================
// SECTION: Service Registry
// ============================================================================

/// One registered service offering with its handler set.
pub struct RegisteredService {
    /// Advertised catalog entry.
    offering: Service,
    /// Handlers implementing the offering.
    handlers: HandlerSet,
}

impl RegisteredService {
    /// Returns the advertised catalog entry.
    #[must_use]
    pub const fn offering(&self) -> &Service {
        &self.offering
    }

    /// Returns the handler set implementing the offering.
    #[must_use]
    pub const fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }
}

/// Builder for the service registry.
///
/// # Invariants
/// - Each registration is validated eagerly; an invalid offering never
///   reaches a built registry.
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    /// Registered services in registration order.
    services: Vec<RegisteredService>,
}

impl ServiceRegistryBuilder {
    /// Registers a service offering with its handler set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] on duplicate identifiers, handler/
    /// capability mismatches, or an invalid dashboard redirect URI.
    pub fn register(
        mut self,
        offering: Service,
        handlers: HandlerSet,
    ) -> Result<Self, ConfigurationError> {
        if self.services.iter().any(|entry| entry.offering.id == offering.id) {
            return Err(ConfigurationError::DuplicateService(offering.id.clone()));
        }
        let mut seen_plans = BTreeSet::new();
        for plan in &offering.plans {
            if !seen_plans.insert(plan.id.clone()) {
                return Err(ConfigurationError::DuplicatePlan {
                    service_id: offering.id.clone(),
                    plan_id: plan.id.clone(),
                });
            }
        }
        if offering.bindable && (handlers.bind.is_none() || handlers.unbind.is_none()) {
            return Err(ConfigurationError::MissingBindHandlers(offering.id.clone()));
        }
        if !offering.bindable && (handlers.bind.is_some() || handlers.unbind.is_some()) {
            return Err(ConfigurationError::UnexpectedBindHandlers(offering.id.clone()));
        }
        if offering.plan_updateable && handlers.update.is_none() {
            return Err(ConfigurationError::MissingUpdateHandler(offering.id.clone()));
        }
        if let Some(client) = &offering.dashboard_client
            && let Err(err) = Url::parse(&client.redirect_uri)
        {
            return Err(ConfigurationError::InvalidDashboardRedirect {
                service_id: offering.id.clone(),
                reason: err.to_string(),
            });
        }
        self.services.push(RegisteredService {
            offering,
            handlers,
        });
        Ok(self)
    }

    /// Builds the immutable registry.
    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}

/// Immutable mapping from service identifiers to handler sets.
///
/// # Invariants
/// - Never mutated after `build`; shared freely across request handling and
///   the reconciliation task without locking.
pub struct ServiceRegistry {
    /// Registered services in registration order.
    services: Vec<RegisteredService>,
}

impl ServiceRegistry {
    /// Returns a builder for the registry.
    #[must_use]
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    /// Resolves a service identifier to its registration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the identifier is unregistered.
    pub fn resolve(&self, service_id: &ServiceId) -> Result<&RegisteredService, ServiceError> {
        self.services
            .iter()
            .find(|entry| &entry.offering.id == service_id)
            .ok_or_else(|| ServiceError::NotFound(format!("unknown service id: {service_id}")))
    }

    /// Returns all registered services in registration order.
    #[must_use]
    pub fn services(&self) -> &[RegisteredService] {
        &self.services
    }

    /// Builds the full advertisable catalog.
    #[must_use]
    pub fn build_catalog(&self) -> Catalog {
        Catalog {
            services: self.services.iter().map(|entry| entry.offering.clone()).collect(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
