// crates/kosli-provider/src/data_sources.rs
// ============================================================================
// Module: Data Sources
// Description: Read-only lookups of attestation types and environments.
// Purpose: Expose remote objects that are not managed by this provider.
// Dependencies: kosli-client, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Data sources read without tracking state, so a missing object is an error
//! rather than [`crate::ReadOutcome::Absent`], and archived objects are
//! returned with their `archived` flag set. Outputs serialize to the flat
//! attribute shape configuration authors consume.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use kosli_client::CancellationToken;
use kosli_client::CustomAttestationType;
use kosli_client::EnvironmentRecord;
use kosli_client::EnvironmentType;
use kosli_client::KosliClient;
use kosli_client::UnixTimestamp;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Operation;
use crate::error::OperationContext;
use crate::error::ProviderError;
use crate::error::ResourceKind;
use crate::lifecycle::non_empty;
use crate::validation::validate_name;

// ============================================================================
// SECTION: Type Names
// ============================================================================

/// Data source for one custom attestation type.
pub const ATTESTATION_TYPE_DATA_SOURCE: &str = "kosli_custom_attestation_type";
/// Data source for one environment of any type.
pub const ENVIRONMENT_DATA_SOURCE: &str = "kosli_environment";
/// Data source for one logical environment.
pub const LOGICAL_ENVIRONMENT_DATA_SOURCE: &str = "kosli_logical_environment";

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Custom attestation type as seen by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationTypeData {
    /// Type name.
    pub name: String,
    /// Description; `None` when empty.
    pub description: Option<String>,
    /// Schema text of the selected version.
    pub schema: Option<String>,
    /// jq rules of the selected version.
    pub jq_rules: Vec<String>,
    /// Soft-delete marker.
    pub archived: bool,
    /// Owning organization.
    pub org: Option<String>,
    /// Selected version number, when the API reports versions.
    pub version: Option<u64>,
}

impl From<CustomAttestationType> for AttestationTypeData {
    fn from(record: CustomAttestationType) -> Self {
        Self {
            description: non_empty(record.description.as_deref()),
            name: record.name,
            schema: record.schema,
            jq_rules: record.jq_rules,
            archived: record.archived,
            org: record.org,
            version: record.version,
        }
    }
}

/// Environment as seen by a data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentData {
    /// Environment name.
    pub name: String,
    /// Type token, `logical` included.
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Description; `None` when empty.
    pub description: Option<String>,
    /// Whether scaling events are recorded.
    pub include_scaling: bool,
    /// Last modification time.
    pub last_modified_at: Option<UnixTimestamp>,
    /// Last snapshot report; `None` when never reported.
    pub last_reported_at: Option<UnixTimestamp>,
    /// Whether artifacts require provenance.
    pub require_provenance: bool,
    /// Server-side tags.
    pub tags: BTreeMap<String, String>,
    /// Opaque server state.
    pub state: Value,
    /// Attached policies.
    pub policies: Vec<Value>,
    /// Soft-delete marker.
    pub archived: bool,
}

impl From<EnvironmentRecord> for EnvironmentData {
    fn from(record: EnvironmentRecord) -> Self {
        Self {
            description: non_empty(record.description.as_deref()),
            name: record.name,
            environment_type: record.environment_type,
            include_scaling: record.include_scaling,
            last_modified_at: record.last_modified_at,
            last_reported_at: record.last_reported_at,
            require_provenance: record.require_provenance,
            tags: record.tags,
            state: record.state,
            policies: record.policies,
            archived: record.archived,
        }
    }
}

/// Logical environment as seen by a data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalEnvironmentData {
    /// Environment name.
    pub name: String,
    /// Description; `None` when empty.
    pub description: Option<String>,
    /// Member names as returned by the API; empty when absent.
    pub included_environments: Vec<String>,
    /// Last modification time.
    pub last_modified_at: Option<UnixTimestamp>,
    /// Soft-delete marker.
    pub archived: bool,
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

/// Read-only lookups bound to an organization.
#[derive(Debug, Clone)]
pub struct DataSources {
    /// Organization-scoped API client.
    client: KosliClient,
}

impl DataSources {
    /// Creates the lookup handle.
    #[must_use]
    pub const fn new(client: KosliClient) -> Self {
        Self { client }
    }

    /// Looks up a custom attestation type, optionally at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] for a malformed name and
    /// [`ProviderError::Api`] when the type or version does not exist.
    pub fn custom_attestation_type(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: Option<u64>,
    ) -> Result<AttestationTypeData, ProviderError> {
        let kind = ResourceKind::CustomAttestationType;
        validate_name(kind, name)?;
        let context = OperationContext::new(Operation::Lookup, kind, name);
        let record = self
            .client
            .get_custom_attestation_type(cancel, name, version)
            .map_err(|err| context.fail(err))?;
        debug!(name, version = ?record.version, "custom attestation type looked up");
        Ok(record.into())
    }

    /// Lists every custom attestation type, archived ones included.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] on failure.
    pub fn custom_attestation_types(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<AttestationTypeData>, ProviderError> {
        let context = OperationContext::new(Operation::List, ResourceKind::CustomAttestationType, "");
        let records =
            self.client.list_custom_attestation_types(cancel).map_err(|err| context.fail(err))?;
        Ok(records.into_iter().map(AttestationTypeData::from).collect())
    }

    /// Looks up an environment of any type.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] for a malformed name and
    /// [`ProviderError::Api`] when the environment does not exist.
    pub fn environment(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<EnvironmentData, ProviderError> {
        let kind = ResourceKind::Environment;
        validate_name(kind, name)?;
        let context = OperationContext::new(Operation::Lookup, kind, name);
        let record = self.client.get_environment(cancel, name).map_err(|err| context.fail(err))?;
        Ok(record.into())
    }

    /// Lists every environment of the organization.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] on failure.
    pub fn environments(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnvironmentData>, ProviderError> {
        let context = OperationContext::new(Operation::List, ResourceKind::Environment, "");
        let records = self.client.list_environments(cancel).map_err(|err| context.fail(err))?;
        Ok(records.into_iter().map(EnvironmentData::from).collect())
    }

    /// Looks up a logical environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnexpectedType`] when the environment exists
    /// but is not logical, and [`ProviderError::Api`] when it does not exist.
    pub fn logical_environment(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<LogicalEnvironmentData, ProviderError> {
        let kind = ResourceKind::LogicalEnvironment;
        validate_name(kind, name)?;
        let context = OperationContext::new(Operation::Lookup, kind, name);
        let record = self.client.get_environment(cancel, name).map_err(|err| context.fail(err))?;
        if record.environment_type != EnvironmentType::Logical.as_str() {
            return Err(ProviderError::UnexpectedType {
                kind,
                name: record.name,
                expected: EnvironmentType::Logical.as_str().to_string(),
                actual: record.environment_type,
            });
        }
        Ok(LogicalEnvironmentData {
            description: non_empty(record.description.as_deref()),
            name: record.name,
            included_environments: record.included_environments.unwrap_or_default(),
            last_modified_at: record.last_modified_at,
            archived: record.archived,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
