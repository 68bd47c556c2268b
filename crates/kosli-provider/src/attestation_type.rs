// crates/kosli-provider/src/attestation_type.rs
// ============================================================================
// Module: Custom Attestation Type Resource
// Description: Reconciliation handlers for custom attestation types.
// Purpose: Map versioned attestation types onto the resource lifecycle.
// Dependencies: kosli-client, tracing, crate::{lifecycle, semantic, validation}
// ============================================================================

//! ## Overview
//! Create and update are the same multipart write: the API versions every
//! changed payload and ignores identical ones, so no existence check is made.
//! Every write is followed by a read because the write only acknowledges.
//! Schema text is compared semantically; after a read the prior text is kept
//! when the server returns an equivalent but reformatted document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kosli_client::AttestationTypeRequest;
use kosli_client::CancellationToken;
use kosli_client::CustomAttestationType;
use kosli_client::KosliClient;
use tracing::info;

use crate::error::Operation;
use crate::error::OperationContext;
use crate::error::ProviderError;
use crate::error::ResourceKind;
use crate::lifecycle::ReadOutcome;
use crate::lifecycle::Resource;
use crate::lifecycle::ResourcePlan;
use crate::lifecycle::non_empty;
use crate::lifecycle::note_change;
use crate::semantic::optional_semantically_equal;
use crate::semantic::reconcile_schema;
use crate::validation::validate_name;
use crate::validation::validate_schema;

// ============================================================================
// SECTION: Models
// ============================================================================

/// Desired state of a custom attestation type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationTypeConfig {
    /// Type name; immutable.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// JSON schema text.
    pub schema: Option<String>,
    /// Ordered jq rules.
    pub jq_rules: Vec<String>,
}

/// Tracked state of a custom attestation type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationTypeState {
    /// Type name.
    pub name: String,
    /// Description; `None` when empty.
    pub description: Option<String>,
    /// JSON schema text, stabilised against reformatting.
    pub schema: Option<String>,
    /// Ordered jq rules of the newest version.
    pub jq_rules: Vec<String>,
    /// Server-derived soft-delete marker.
    pub archived: bool,
}

impl AttestationTypeState {
    /// Builds state from a fetched record, keeping `prior_schema` when equivalent.
    fn from_remote(record: CustomAttestationType, prior_schema: Option<&str>) -> Self {
        Self {
            schema: reconcile_schema(prior_schema, record.schema),
            name: record.name,
            description: non_empty(record.description.as_deref()),
            jq_rules: record.jq_rules,
            archived: record.archived,
        }
    }
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Handlers for `kosli_custom_attestation_type`.
#[derive(Debug, Clone)]
pub struct CustomAttestationTypeResource {
    /// Organization-scoped API client.
    client: KosliClient,
}

impl CustomAttestationTypeResource {
    /// Creates the resource handler.
    #[must_use]
    pub const fn new(client: KosliClient) -> Self {
        Self { client }
    }

    /// Validates desired state.
    fn validate(desired: &AttestationTypeConfig) -> Result<(), ProviderError> {
        validate_name(ResourceKind::CustomAttestationType, &desired.name)?;
        if let Some(schema) = desired.schema.as_deref().filter(|schema| !schema.is_empty()) {
            validate_schema(ResourceKind::CustomAttestationType, &desired.name, schema)?;
        }
        Ok(())
    }

    /// Writes desired state, then reads it back.
    fn write_then_read(
        &self,
        cancel: &CancellationToken,
        operation: Operation,
        desired: &AttestationTypeConfig,
    ) -> Result<AttestationTypeState, ProviderError> {
        let context =
            OperationContext::new(operation, ResourceKind::CustomAttestationType, &desired.name);
        let request = AttestationTypeRequest {
            name: desired.name.clone(),
            description: non_empty(desired.description.as_deref()),
            schema: non_empty(desired.schema.as_deref()),
            jq_rules: desired.jq_rules.clone(),
        };
        self.client
            .write_custom_attestation_type(cancel, &request)
            .map_err(|err| context.fail(err))?;
        info!(name = %desired.name, operation = %operation, "custom attestation type written");
        let record = self
            .client
            .get_custom_attestation_type(cancel, &desired.name, None)
            .map_err(|err| context.inconsistent(err))?;
        Ok(AttestationTypeState::from_remote(record, desired.schema.as_deref()))
    }
}

impl Resource for CustomAttestationTypeResource {
    type Config = AttestationTypeConfig;
    type State = AttestationTypeState;

    const TYPE_NAME: &'static str = "kosli_custom_attestation_type";

    fn plan(
        &self,
        prior: Option<&AttestationTypeState>,
        desired: &AttestationTypeConfig,
    ) -> Result<ResourcePlan, ProviderError> {
        Self::validate(desired)?;
        let Some(prior) = prior else {
            return Ok(ResourcePlan::Create);
        };
        if prior.name != desired.name {
            return Ok(ResourcePlan::Replace {
                attributes: vec!["name"],
            });
        }
        let mut changes = Vec::new();
        note_change(
            &mut changes,
            "description",
            prior.description != non_empty(desired.description.as_deref()),
        );
        note_change(
            &mut changes,
            "schema",
            !optional_semantically_equal(
                prior.schema.as_deref().filter(|schema| !schema.is_empty()),
                desired.schema.as_deref().filter(|schema| !schema.is_empty()),
            ),
        );
        note_change(&mut changes, "jq_rules", prior.jq_rules != desired.jq_rules);
        Ok(ResourcePlan::from_changes(changes))
    }

    fn create(
        &self,
        cancel: &CancellationToken,
        desired: &AttestationTypeConfig,
    ) -> Result<AttestationTypeState, ProviderError> {
        Self::validate(desired)?;
        self.write_then_read(cancel, Operation::Create, desired)
    }

    fn read(
        &self,
        cancel: &CancellationToken,
        prior: &AttestationTypeState,
    ) -> Result<ReadOutcome<AttestationTypeState>, ProviderError> {
        let context =
            OperationContext::new(Operation::Read, ResourceKind::CustomAttestationType, &prior.name);
        match self.client.get_custom_attestation_type(cancel, &prior.name, None) {
            Ok(record) if record.archived => Ok(ReadOutcome::Absent),
            Ok(record) => Ok(ReadOutcome::Present(AttestationTypeState::from_remote(
                record,
                prior.schema.as_deref(),
            ))),
            Err(err) if err.is_not_found() => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }

    fn update(
        &self,
        cancel: &CancellationToken,
        prior: &AttestationTypeState,
        desired: &AttestationTypeConfig,
    ) -> Result<AttestationTypeState, ProviderError> {
        if prior.name != desired.name {
            return Err(ProviderError::RequiresReplacement {
                kind: ResourceKind::CustomAttestationType,
                name: prior.name.clone(),
                attribute: "name",
                from: prior.name.clone(),
                to: desired.name.clone(),
            });
        }
        Self::validate(desired)?;
        self.write_then_read(cancel, Operation::Update, desired)
    }

    fn delete(
        &self,
        cancel: &CancellationToken,
        prior: &AttestationTypeState,
    ) -> Result<(), ProviderError> {
        let context = OperationContext::new(
            Operation::Delete,
            ResourceKind::CustomAttestationType,
            &prior.name,
        );
        match self.client.archive_custom_attestation_type(cancel, &prior.name) {
            Ok(()) => {
                info!(name = %prior.name, "custom attestation type archived");
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(context.fail(err)),
        }
    }

    fn import(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<ReadOutcome<AttestationTypeState>, ProviderError> {
        let context =
            OperationContext::new(Operation::Import, ResourceKind::CustomAttestationType, name);
        match self.client.get_custom_attestation_type(cancel, name, None) {
            Ok(record) if record.archived => Ok(ReadOutcome::Absent),
            Ok(record) => Ok(ReadOutcome::Present(AttestationTypeState::from_remote(record, None))),
            Err(err) if err.is_not_found() => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }
}
