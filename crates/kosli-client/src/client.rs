// crates/kosli-client/src/client.rs
// ============================================================================
// Module: Kosli API Client
// Description: Typed endpoints for attestation types and environments.
// Purpose: Bind the organization to a transport and expose the REST surface.
// Dependencies: serde_json, tracing, crate::{attestation, environment, transport}
// ============================================================================

//! ## Overview
//! [`KosliClient`] is the explicit handle threaded into every resource
//! handler. It owns the organization name and a shared [`Transport`], so tests
//! can swap the HTTP transport for an in-memory one. Write endpoints return
//! `()`: the API answers with a bare acknowledgement, never the written object,
//! and callers must re-read to learn the authoritative state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::attestation::AttestationTypeRequest;
use crate::attestation::CustomAttestationType;
use crate::attestation::WireAttestationType;
use crate::environment::EnvironmentRecord;
use crate::environment::EnvironmentUpsert;
use crate::error::ClientError;
use crate::transport::ApiRequest;
use crate::transport::ApiResponse;
use crate::transport::CancellationToken;
use crate::transport::Method;
use crate::transport::RequestBody;
use crate::transport::Transport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path prefix for custom attestation types.
const ATTESTATION_TYPES: &str = "custom-attestation-types";
/// Path prefix for environments.
const ENVIRONMENTS: &str = "environments";
/// Path suffix for archive calls.
const ARCHIVE: &str = "archive";
/// Status returned by a successful attestation type write.
const STATUS_CREATED: u16 = 201;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Organization-scoped Kosli API client.
///
/// # Invariants
/// - `organization` is non-empty.
/// - Cloning is cheap and clones share the transport.
#[derive(Clone)]
pub struct KosliClient {
    /// Shared request executor.
    transport: Arc<dyn Transport>,
    /// Organization every path is scoped to.
    organization: String,
}

impl fmt::Debug for KosliClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KosliClient")
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

impl KosliClient {
    /// Creates a client for `organization`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the organization is empty.
    pub fn new(
        transport: Arc<dyn Transport>,
        organization: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let organization = organization.into();
        if organization.trim().is_empty() {
            return Err(ClientError::Config("organization is required".to_string()));
        }
        Ok(Self {
            transport,
            organization,
        })
    }

    /// Returns the organization name.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    // ------------------------------------------------------------------------
    // Generic verbs
    // ------------------------------------------------------------------------

    /// Executes an arbitrary request.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClientError`].
    pub fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        self.transport.execute(cancel, request)
    }

    /// Issues a `GET`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClientError`].
    pub fn get(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
    ) -> Result<ApiResponse, ClientError> {
        self.execute(cancel, &ApiRequest::new(Method::Get, segments.iter().copied()))
    }

    /// Issues a `POST`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClientError`].
    pub fn post(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
        body: RequestBody,
    ) -> Result<ApiResponse, ClientError> {
        let request = ApiRequest::new(Method::Post, segments.iter().copied()).with_body(body);
        self.execute(cancel, &request)
    }

    /// Issues a `PUT`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClientError`].
    pub fn put(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
        body: RequestBody,
    ) -> Result<ApiResponse, ClientError> {
        let request = ApiRequest::new(Method::Put, segments.iter().copied()).with_body(body);
        self.execute(cancel, &request)
    }

    /// Issues a `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ClientError`].
    pub fn delete(
        &self,
        cancel: &CancellationToken,
        segments: &[&str],
    ) -> Result<ApiResponse, ClientError> {
        self.execute(cancel, &ApiRequest::new(Method::Delete, segments.iter().copied()))
    }

    // ------------------------------------------------------------------------
    // Custom attestation types
    // ------------------------------------------------------------------------

    /// Lists all custom attestation types of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or decode failure.
    pub fn list_custom_attestation_types(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CustomAttestationType>, ClientError> {
        let response = self.get(cancel, &[ATTESTATION_TYPES, &self.organization])?;
        let records: Vec<WireAttestationType> = response.json()?;
        Ok(records.into_iter().map(CustomAttestationType::from_wire).collect())
    }

    /// Fetches one custom attestation type, optionally at a specific version.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or decode failure; a missing type
    /// is an API 404.
    pub fn get_custom_attestation_type(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: Option<u64>,
    ) -> Result<CustomAttestationType, ClientError> {
        let mut request =
            ApiRequest::new(Method::Get, [ATTESTATION_TYPES, self.organization.as_str(), name]);
        if let Some(version) = version {
            request = request.with_query("version", version.to_string());
        }
        let record: WireAttestationType = self.execute(cancel, &request)?.json()?;
        Ok(CustomAttestationType::from_wire(record))
    }

    /// Writes a custom attestation type (create or new version).
    ///
    /// The request is replay-safe: the server only creates a version when the
    /// payload differs from the newest one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or when the API answers
    /// with anything other than `201 Created`.
    pub fn write_custom_attestation_type(
        &self,
        cancel: &CancellationToken,
        request: &AttestationTypeRequest,
    ) -> Result<(), ClientError> {
        let body = request.to_multipart()?;
        let api_request =
            ApiRequest::new(Method::Post, [ATTESTATION_TYPES, self.organization.as_str()])
                .with_body(RequestBody::Multipart(body))
                .idempotent(true);
        let response = self.execute(cancel, &api_request)?;
        if response.status != STATUS_CREATED {
            return Err(ClientError::Decode(format!(
                "unexpected status code: {}",
                response.status
            )));
        }
        debug!(name = %request.name, "custom attestation type written");
        Ok(())
    }

    /// Archives a custom attestation type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub fn archive_custom_attestation_type(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<(), ClientError> {
        self.put(cancel, &[ATTESTATION_TYPES, &self.organization, name, ARCHIVE], RequestBody::Empty)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Environments
    // ------------------------------------------------------------------------

    /// Lists all environments of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or decode failure.
    pub fn list_environments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnvironmentRecord>, ClientError> {
        self.get(cancel, &[ENVIRONMENTS, &self.organization])?.json()
    }

    /// Fetches one environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or decode failure; a missing
    /// environment is an API 404.
    pub fn get_environment(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<EnvironmentRecord, ClientError> {
        self.get(cancel, &[ENVIRONMENTS, &self.organization, name])?.json()
    }

    /// Creates or replaces an environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub fn upsert_environment(
        &self,
        cancel: &CancellationToken,
        upsert: &EnvironmentUpsert,
    ) -> Result<(), ClientError> {
        let body = serde_json::to_value(upsert)
            .map_err(|err| ClientError::Request(format!("failed to marshal request body: {err}")))?;
        self.put(cancel, &[ENVIRONMENTS, &self.organization], RequestBody::Json(body))?;
        debug!(name = %upsert.name, environment_type = %upsert.environment_type, "environment upserted");
        Ok(())
    }

    /// Archives an environment.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure.
    pub fn archive_environment(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<(), ClientError> {
        self.put(cancel, &[ENVIRONMENTS, &self.organization, name, ARCHIVE], RequestBody::Empty)?;
        Ok(())
    }
}

