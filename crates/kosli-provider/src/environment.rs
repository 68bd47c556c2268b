// crates/kosli-provider/src/environment.rs
// ============================================================================
// Module: Physical Environment Resource
// Description: Reconciliation handlers for physical environments.
// Purpose: Map environment upserts and archival onto the resource lifecycle.
// Dependencies: kosli-client, serde_json, tracing, crate::{lifecycle, validation}
// ============================================================================

//! ## Overview
//! Create and update share one full-state upsert; there is no patch call.
//! `name` and `type` are immutable and force replacement. Server-maintained
//! fields (`last_modified_at`, `last_reported_at`, `tags`, `state`) are
//! refreshed on every read; a `last_reported_at` of `None` means the
//! environment never reported. Attached policies are opaque and forwarded
//! unchanged on update so an update never detaches them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use kosli_client::CancellationToken;
use kosli_client::ClientError;
use kosli_client::EnvironmentRecord;
use kosli_client::EnvironmentType;
use kosli_client::EnvironmentUpsert;
use kosli_client::KosliClient;
use kosli_client::UnixTimestamp;
use serde_json::Value;
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
use crate::validation::parse_physical_type;
use crate::validation::validate_name;

// ============================================================================
// SECTION: Models
// ============================================================================

/// Desired state of a physical environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Environment name; immutable.
    pub name: String,
    /// Type token (`K8S`, `ECS`, `S3`, `docker`, `server`, `lambda`); immutable.
    pub environment_type: String,
    /// Description.
    pub description: Option<String>,
    /// Whether scaling events are recorded.
    pub include_scaling: bool,
}

/// Tracked state of a physical environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentState {
    /// Environment name.
    pub name: String,
    /// Type token.
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
    /// Attached policies, forwarded on update.
    pub policies: Vec<Value>,
}

impl EnvironmentState {
    /// Builds state from a fetched record.
    fn from_remote(record: EnvironmentRecord) -> Self {
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
        }
    }
}

// ============================================================================
// SECTION: Shared Fetch
// ============================================================================

/// Fetches an environment; `None` when missing or archived.
pub(crate) fn fetch_live_environment(
    client: &KosliClient,
    cancel: &CancellationToken,
    name: &str,
) -> Result<Option<EnvironmentRecord>, ClientError> {
    match client.get_environment(cancel, name) {
        Ok(record) if record.archived => Ok(None),
        Ok(record) => Ok(Some(record)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Archives an environment; a missing environment counts as archived.
pub(crate) fn archive_environment(
    client: &KosliClient,
    cancel: &CancellationToken,
    context: &OperationContext,
) -> Result<(), ProviderError> {
    match client.archive_environment(cancel, &context.name) {
        Ok(()) => {
            info!(name = %context.name, kind = %context.kind, "environment archived");
            Ok(())
        }
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(context.fail(err)),
    }
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Handlers for `kosli_environment`.
#[derive(Debug, Clone)]
pub struct EnvironmentResource {
    /// Organization-scoped API client.
    client: KosliClient,
}

impl EnvironmentResource {
    /// Creates the resource handler.
    #[must_use]
    pub const fn new(client: KosliClient) -> Self {
        Self { client }
    }

    /// Validates desired state and returns the parsed type.
    fn validate(desired: &EnvironmentConfig) -> Result<EnvironmentType, ProviderError> {
        validate_name(ResourceKind::Environment, &desired.name)?;
        parse_physical_type(&desired.name, &desired.environment_type)
    }

    /// Converts a fetched record, rejecting logical environments.
    fn state_from(record: EnvironmentRecord) -> Result<EnvironmentState, ProviderError> {
        if record.environment_type == EnvironmentType::Logical.as_str() {
            return Err(ProviderError::UnexpectedType {
                kind: ResourceKind::Environment,
                name: record.name,
                expected: "physical".to_string(),
                actual: record.environment_type,
            });
        }
        Ok(EnvironmentState::from_remote(record))
    }

    /// Upserts desired state, then reads it back.
    fn upsert_then_read(
        &self,
        cancel: &CancellationToken,
        operation: Operation,
        desired: &EnvironmentConfig,
        policies: Vec<Value>,
    ) -> Result<EnvironmentState, ProviderError> {
        let environment_type = Self::validate(desired)?;
        let context = OperationContext::new(operation, ResourceKind::Environment, &desired.name);
        let mut upsert = EnvironmentUpsert::physical(
            desired.name.clone(),
            environment_type,
            desired.description.as_deref(),
            desired.include_scaling,
        );
        upsert.policies = policies;
        self.client.upsert_environment(cancel, &upsert).map_err(|err| context.fail(err))?;
        info!(name = %desired.name, operation = %operation, "environment upserted");
        let record = match fetch_live_environment(&self.client, cancel, &desired.name) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(context.inconsistent(ClientError::Decode(
                    "environment not found after upsert".to_string(),
                )));
            }
            Err(err) => return Err(context.inconsistent(err)),
        };
        Self::state_from(record)
    }
}

impl Resource for EnvironmentResource {
    type Config = EnvironmentConfig;
    type State = EnvironmentState;

    const TYPE_NAME: &'static str = "kosli_environment";

    fn plan(
        &self,
        prior: Option<&EnvironmentState>,
        desired: &EnvironmentConfig,
    ) -> Result<ResourcePlan, ProviderError> {
        Self::validate(desired)?;
        let Some(prior) = prior else {
            return Ok(ResourcePlan::Create);
        };
        let mut immutable = Vec::new();
        note_change(&mut immutable, "name", prior.name != desired.name);
        note_change(&mut immutable, "type", prior.environment_type != desired.environment_type);
        if !immutable.is_empty() {
            return Ok(ResourcePlan::Replace {
                attributes: immutable,
            });
        }
        let mut changes = Vec::new();
        note_change(
            &mut changes,
            "description",
            prior.description != non_empty(desired.description.as_deref()),
        );
        note_change(&mut changes, "include_scaling", prior.include_scaling != desired.include_scaling);
        Ok(ResourcePlan::from_changes(changes))
    }

    fn create(
        &self,
        cancel: &CancellationToken,
        desired: &EnvironmentConfig,
    ) -> Result<EnvironmentState, ProviderError> {
        self.upsert_then_read(cancel, Operation::Create, desired, Vec::new())
    }

    fn read(
        &self,
        cancel: &CancellationToken,
        prior: &EnvironmentState,
    ) -> Result<ReadOutcome<EnvironmentState>, ProviderError> {
        let context = OperationContext::new(Operation::Read, ResourceKind::Environment, &prior.name);
        match fetch_live_environment(&self.client, cancel, &prior.name) {
            Ok(Some(record)) => Self::state_from(record).map(ReadOutcome::Present),
            Ok(None) => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }

    fn update(
        &self,
        cancel: &CancellationToken,
        prior: &EnvironmentState,
        desired: &EnvironmentConfig,
    ) -> Result<EnvironmentState, ProviderError> {
        let immutable = [
            ("name", &prior.name, &desired.name),
            ("type", &prior.environment_type, &desired.environment_type),
        ];
        if let Some((attribute, from, to)) = immutable.into_iter().find(|(_, from, to)| from != to) {
            return Err(ProviderError::RequiresReplacement {
                kind: ResourceKind::Environment,
                name: prior.name.clone(),
                attribute,
                from: from.clone(),
                to: to.clone(),
            });
        }
        self.upsert_then_read(cancel, Operation::Update, desired, prior.policies.clone())
    }

    fn delete(&self, cancel: &CancellationToken, prior: &EnvironmentState) -> Result<(), ProviderError> {
        let context = OperationContext::new(Operation::Delete, ResourceKind::Environment, &prior.name);
        archive_environment(&self.client, cancel, &context)
    }

    fn import(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<ReadOutcome<EnvironmentState>, ProviderError> {
        let context = OperationContext::new(Operation::Import, ResourceKind::Environment, name);
        match fetch_live_environment(&self.client, cancel, name) {
            Ok(Some(record)) => Self::state_from(record).map(ReadOutcome::Present),
            Ok(None) => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }
}
