// crates/kosli-config/src/lib.rs
// ============================================================================
// Module: Kosli Config Library
// Description: Provider configuration model and client construction.
// Purpose: Single source of truth for provider settings and their defaults.
// Dependencies: kosli-client, serde, toml
// ============================================================================

//! ## Overview
//! `kosli-config` resolves the provider configuration (token, organization,
//! endpoint, timeout, retry policy) from an optional TOML file plus
//! environment fallbacks, validates it fail-closed, and builds the
//! [`kosli_client::KosliClient`] injected into every resource handler.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
