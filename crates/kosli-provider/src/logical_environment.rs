// crates/kosli-provider/src/logical_environment.rs
// ============================================================================
// Module: Logical Environment Resource
// Description: Reconciliation handlers for logical (aggregate) environments.
// Purpose: Track membership lists the read endpoint does not return.
// Dependencies: kosli-client, tracing, crate::{environment, lifecycle, validation}
// ============================================================================

//! ## Overview
//! A logical environment aggregates physical ones. The environment GET does
//! not return `included_environments`, so the tracked list is never taken
//! from a managed read: create and update keep the desired list, read keeps
//! the prior list. Only import, which has nothing to preserve, uses the wire
//! value (empty when absent). Membership rules beyond self-inclusion are
//! enforced by the server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kosli_client::CancellationToken;
use kosli_client::ClientError;
use kosli_client::EnvironmentRecord;
use kosli_client::EnvironmentType;
use kosli_client::EnvironmentUpsert;
use kosli_client::KosliClient;
use kosli_client::UnixTimestamp;
use tracing::info;

use crate::environment::archive_environment;
use crate::environment::fetch_live_environment;
use crate::error::Operation;
use crate::error::OperationContext;
use crate::error::ProviderError;
use crate::error::ResourceKind;
use crate::lifecycle::ReadOutcome;
use crate::lifecycle::Resource;
use crate::lifecycle::ResourcePlan;
use crate::lifecycle::non_empty;
use crate::lifecycle::note_change;
use crate::validation::invalid;
use crate::validation::validate_name;

// ============================================================================
// SECTION: Models
// ============================================================================

/// Desired state of a logical environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalEnvironmentConfig {
    /// Environment name; immutable.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Ordered member environment names.
    pub included_environments: Vec<String>,
}

/// Tracked state of a logical environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalEnvironmentState {
    /// Environment name.
    pub name: String,
    /// Description; `None` when empty.
    pub description: Option<String>,
    /// Ordered member environment names, as last written.
    pub included_environments: Vec<String>,
    /// Last modification time.
    pub last_modified_at: Option<UnixTimestamp>,
}

impl LogicalEnvironmentState {
    /// Builds state from a fetched record and the authoritative member list.
    fn from_remote(record: EnvironmentRecord, included_environments: Vec<String>) -> Self {
        Self {
            description: non_empty(record.description.as_deref()),
            name: record.name,
            included_environments,
            last_modified_at: record.last_modified_at,
        }
    }
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Handlers for `kosli_logical_environment`.
#[derive(Debug, Clone)]
pub struct LogicalEnvironmentResource {
    /// Organization-scoped API client.
    client: KosliClient,
}

impl LogicalEnvironmentResource {
    /// Creates the resource handler.
    #[must_use]
    pub const fn new(client: KosliClient) -> Self {
        Self { client }
    }

    /// Validates desired state.
    fn validate(desired: &LogicalEnvironmentConfig) -> Result<(), ProviderError> {
        let kind = ResourceKind::LogicalEnvironment;
        validate_name(kind, &desired.name)?;
        for member in &desired.included_environments {
            validate_name(kind, member).map_err(|_| {
                invalid(kind, &desired.name, &format!("included environment \"{member}\" is not a valid name"))
            })?;
        }
        if desired.included_environments.contains(&desired.name) {
            return Err(invalid(kind, &desired.name, "a logical environment cannot include itself"));
        }
        Ok(())
    }

    /// Rejects records that are not logical environments.
    fn ensure_logical(record: &EnvironmentRecord) -> Result<(), ProviderError> {
        if record.environment_type == EnvironmentType::Logical.as_str() {
            return Ok(());
        }
        Err(ProviderError::UnexpectedType {
            kind: ResourceKind::LogicalEnvironment,
            name: record.name.clone(),
            expected: EnvironmentType::Logical.as_str().to_string(),
            actual: record.environment_type.clone(),
        })
    }

    /// Upserts desired state, then reads it back keeping the desired members.
    fn upsert_then_read(
        &self,
        cancel: &CancellationToken,
        operation: Operation,
        desired: &LogicalEnvironmentConfig,
    ) -> Result<LogicalEnvironmentState, ProviderError> {
        Self::validate(desired)?;
        let context =
            OperationContext::new(operation, ResourceKind::LogicalEnvironment, &desired.name);
        let upsert = EnvironmentUpsert::logical(
            desired.name.clone(),
            desired.description.as_deref(),
            desired.included_environments.clone(),
        );
        self.client.upsert_environment(cancel, &upsert).map_err(|err| context.fail(err))?;
        info!(
            name = %desired.name,
            operation = %operation,
            members = desired.included_environments.len(),
            "logical environment upserted"
        );
        let record = match fetch_live_environment(&self.client, cancel, &desired.name) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(context.inconsistent(ClientError::Decode(
                    "logical environment not found after upsert".to_string(),
                )));
            }
            Err(err) => return Err(context.inconsistent(err)),
        };
        Self::ensure_logical(&record)?;
        Ok(LogicalEnvironmentState::from_remote(record, desired.included_environments.clone()))
    }
}

impl Resource for LogicalEnvironmentResource {
    type Config = LogicalEnvironmentConfig;
    type State = LogicalEnvironmentState;

    const TYPE_NAME: &'static str = "kosli_logical_environment";

    fn plan(
        &self,
        prior: Option<&LogicalEnvironmentState>,
        desired: &LogicalEnvironmentConfig,
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
            "included_environments",
            prior.included_environments != desired.included_environments,
        );
        Ok(ResourcePlan::from_changes(changes))
    }

    fn create(
        &self,
        cancel: &CancellationToken,
        desired: &LogicalEnvironmentConfig,
    ) -> Result<LogicalEnvironmentState, ProviderError> {
        self.upsert_then_read(cancel, Operation::Create, desired)
    }

    fn read(
        &self,
        cancel: &CancellationToken,
        prior: &LogicalEnvironmentState,
    ) -> Result<ReadOutcome<LogicalEnvironmentState>, ProviderError> {
        let context =
            OperationContext::new(Operation::Read, ResourceKind::LogicalEnvironment, &prior.name);
        match fetch_live_environment(&self.client, cancel, &prior.name) {
            Ok(Some(record)) => {
                Self::ensure_logical(&record)?;
                Ok(ReadOutcome::Present(LogicalEnvironmentState::from_remote(
                    record,
                    prior.included_environments.clone(),
                )))
            }
            Ok(None) => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }

    fn update(
        &self,
        cancel: &CancellationToken,
        prior: &LogicalEnvironmentState,
        desired: &LogicalEnvironmentConfig,
    ) -> Result<LogicalEnvironmentState, ProviderError> {
        if prior.name != desired.name {
            return Err(ProviderError::RequiresReplacement {
                kind: ResourceKind::LogicalEnvironment,
                name: prior.name.clone(),
                attribute: "name",
                from: prior.name.clone(),
                to: desired.name.clone(),
            });
        }
        self.upsert_then_read(cancel, Operation::Update, desired)
    }

    fn delete(
        &self,
        cancel: &CancellationToken,
        prior: &LogicalEnvironmentState,
    ) -> Result<(), ProviderError> {
        let context =
            OperationContext::new(Operation::Delete, ResourceKind::LogicalEnvironment, &prior.name);
        archive_environment(&self.client, cancel, &context)
    }

    fn import(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<ReadOutcome<LogicalEnvironmentState>, ProviderError> {
        let context = OperationContext::new(Operation::Import, ResourceKind::LogicalEnvironment, name);
        match fetch_live_environment(&self.client, cancel, name) {
            Ok(Some(mut record)) => {
                Self::ensure_logical(&record)?;
                let members = record.included_environments.take().unwrap_or_default();
                Ok(ReadOutcome::Present(LogicalEnvironmentState::from_remote(record, members)))
            }
            Ok(None) => Ok(ReadOutcome::Absent),
            Err(err) => Err(context.fail(err)),
        }
    }
}
