// crates/portico-server/src/lib.rs
// ============================================================================
// Module: Portico Server Library
// Description: HTTP surface, authentication, and audit for the Portico broker.
// Purpose: Expose the lifecycle protocol over axum with Basic auth.
// Dependencies: portico-broker, portico-config, axum
// ============================================================================

//! ## Overview
//! Portico server exposes the broker engine over HTTP. All routing,
//! authentication, and audit concerns live here; protocol semantics stay in
//! [`portico_broker::Dispatcher`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::NoopAuditSink;
pub use audit::RequestAuditEvent;
pub use audit::RequestAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthError;
pub use auth::BrokerCredentials;
pub use auth::authorize_basic;
pub use server::API_VERSION_HEADER;
pub use server::BrokerServer;
pub use server::ServerError;
pub use server::ServerState;
pub use server::router;
