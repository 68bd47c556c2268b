// crates/kosli-provider/src/lib.rs
// ============================================================================
// Module: Kosli Provider Library
// Description: Resource handlers, data sources and plan logic for Kosli.
// Purpose: Reconcile desired infrastructure state with the Kosli API.
// Dependencies: bigdecimal, kosli-client, kosli-config, serde, serde_json,
//               thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! Each managed object kind implements [`Resource`]: a pure `plan` plus
//! create, read, update, delete and import handlers that always confirm
//! writes with a follow-up read. [`apply`] drives one resource the way an
//! orchestrating engine would. [`DataSources`] serves read-only lookups, and
//! [`KosliProvider`] binds everything to one configured client.
//! Invariants:
//! - Validation and immutable-field checks run before any network call.
//! - Missing or archived objects read as [`ReadOutcome::Absent`].
//! - Logical environment membership is never taken from a managed read.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod attestation_type;
pub mod data_sources;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod logical_environment;
pub mod provider;
pub mod semantic;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attestation_type::AttestationTypeConfig;
pub use attestation_type::AttestationTypeState;
pub use attestation_type::CustomAttestationTypeResource;
pub use data_sources::AttestationTypeData;
pub use data_sources::DataSources;
pub use data_sources::EnvironmentData;
pub use data_sources::LogicalEnvironmentData;
pub use environment::EnvironmentConfig;
pub use environment::EnvironmentResource;
pub use environment::EnvironmentState;
pub use error::Operation;
pub use error::OperationContext;
pub use error::ProviderError;
pub use error::ResourceKind;
pub use lifecycle::ReadOutcome;
pub use lifecycle::Resource;
pub use lifecycle::ResourcePlan;
pub use lifecycle::apply;
pub use logging::LoggingError;
pub use logging::init_logging;
pub use logical_environment::LogicalEnvironmentConfig;
pub use logical_environment::LogicalEnvironmentResource;
pub use logical_environment::LogicalEnvironmentState;
pub use provider::KosliProvider;
pub use semantic::semantically_equal;
