// crates/portico-config/src/lib.rs
// ============================================================================
// Module: Portico Config Library
// Description: Canonical config model and validation for the Portico broker.
// Purpose: Single source of truth for portico.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `portico-config` defines the canonical configuration model for the Portico
//! broker. It provides strict, fail-closed validation: a broker never starts
//! with missing credentials, an unparseable bind address, or out-of-range
//! reconciliation timing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
