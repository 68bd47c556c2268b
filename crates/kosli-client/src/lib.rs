// crates/kosli-client/src/lib.rs
// ============================================================================
// Module: Kosli Client
// Description: Transport, wire types and typed endpoints for the Kosli API.
// Purpose: Give resource handlers a typed, testable view of the REST surface.
// Dependencies: reqwest, serde, serde_json, thiserror, time, tracing, url
// ============================================================================

//! ## Overview
//! This crate wraps the Kosli REST API: a [`Transport`] abstraction with a
//! blocking HTTP implementation (auth, retries, error classification,
//! cancellation), the wire models for custom attestation types and
//! environments, and the pure transformers between wire and user formats.
//! The [`KosliClient`] handle binds an organization to a transport.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod attestation;
pub mod client;
pub mod environment;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;
pub mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use attestation::AttestationTypeRequest;
pub use attestation::CustomAttestationType;
pub use attestation::Evaluator;
pub use attestation::WireAttestationType;
pub use client::KosliClient;
pub use environment::EnvironmentRecord;
pub use environment::EnvironmentType;
pub use environment::EnvironmentUpsert;
pub use environment::PHYSICAL_ENVIRONMENT_TYPES;
pub use environment::UnknownEnvironmentType;
pub use error::ApiError;
pub use error::ApiErrorKind;
pub use error::ClientError;
pub use http::HttpTransport;
pub use http::HttpTransportConfig;
pub use retry::RetryPolicy;
pub use transport::ApiRequest;
pub use transport::ApiResponse;
pub use transport::CancellationToken;
pub use transport::Method;
pub use transport::RequestBody;
pub use transport::Transport;
pub use wire::UnixTimestamp;

#[cfg(test)]
mod tests;
