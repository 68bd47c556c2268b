// crates/kosli-client/src/environment.rs
// ============================================================================
// Module: Environment Wire Types
// Description: Environment records, upsert payloads and environment kinds.
// Purpose: Decode environment reads and encode full-state upserts.
// Dependencies: serde, serde_json, thiserror, crate::wire
// ============================================================================

//! ## Overview
//! Physical and logical environments share one wire shape. Reads are decoded
//! tolerantly: missing collections become empty, missing timestamps stay
//! `None`, and `included_environments` stays `None` when the API omits it so
//! callers can tell "absent" from "empty".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::wire::UnixTimestamp;
use crate::wire::null_as_default;

// ============================================================================
// SECTION: Environment Types
// ============================================================================

/// Kind of environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentType {
    /// Kubernetes cluster.
    K8s,
    /// Amazon ECS.
    Ecs,
    /// Amazon S3 bucket.
    S3,
    /// Docker host.
    Docker,
    /// Bare server.
    Server,
    /// AWS Lambda.
    Lambda,
    /// Aggregate of physical environments.
    Logical,
}

/// Physical environment types in canonical order.
pub const PHYSICAL_ENVIRONMENT_TYPES: [EnvironmentType; 6] = [
    EnvironmentType::K8s,
    EnvironmentType::Ecs,
    EnvironmentType::S3,
    EnvironmentType::Docker,
    EnvironmentType::Server,
    EnvironmentType::Lambda,
];

impl EnvironmentType {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::K8s => "K8S",
            Self::Ecs => "ECS",
            Self::S3 => "S3",
            Self::Docker => "docker",
            Self::Server => "server",
            Self::Lambda => "lambda",
            Self::Logical => "logical",
        }
    }

    /// Returns true for every type except `logical`.
    #[must_use]
    pub const fn is_physical(self) -> bool {
        !matches!(self, Self::Logical)
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown environment type token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment type: {0}")]
pub struct UnknownEnvironmentType(pub String);

impl FromStr for EnvironmentType {
    type Err = UnknownEnvironmentType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "K8S" => Ok(Self::K8s),
            "ECS" => Ok(Self::Ecs),
            "S3" => Ok(Self::S3),
            "docker" => Ok(Self::Docker),
            "server" => Ok(Self::Server),
            "lambda" => Ok(Self::Lambda),
            "logical" => Ok(Self::Logical),
            other => Err(UnknownEnvironmentType(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Wire Record
// ============================================================================

/// Environment as returned by `GET /environments/{org}/{name}`.
///
/// # Invariants
/// - `last_reported_at == None` means the environment never reported.
/// - `included_environments == None` means the API omitted the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// Owning organization.
    #[serde(default)]
    pub org: Option<String>,
    /// Environment name.
    pub name: String,
    /// Environment type token; kept raw so new server types still decode.
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub last_modified_at: Option<UnixTimestamp>,
    /// Last snapshot report time.
    #[serde(default)]
    pub last_reported_at: Option<UnixTimestamp>,
    /// Opaque server state.
    #[serde(default)]
    pub state: Value,
    /// Whether scaling events are recorded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub include_scaling: bool,
    /// Whether artifacts require provenance.
    #[serde(default, deserialize_with = "null_as_default")]
    pub require_provenance: bool,
    /// Tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
    /// Attached policies, passed through untouched.
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: Vec<Value>,
    /// Member environments; logical environments only and often omitted.
    #[serde(default)]
    pub included_environments: Option<Vec<String>>,
    /// Soft-delete marker.
    #[serde(default, deserialize_with = "null_as_default")]
    pub archived: bool,
}

impl EnvironmentRecord {
    /// Parses the environment type token.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEnvironmentType`] for tokens this client does not know.
    pub fn kind(&self) -> Result<EnvironmentType, UnknownEnvironmentType> {
        self.environment_type.parse()
    }
}

// ============================================================================
// SECTION: Upsert Payload
// ============================================================================

/// Full-state payload for `PUT /environments/{org}`.
///
/// # Invariants
/// - Every field is always sent; the endpoint has no patch semantics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentUpsert {
    /// Environment name.
    pub name: String,
    /// Environment type token.
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Description; empty when unset.
    pub description: String,
    /// Whether scaling events are recorded.
    pub include_scaling: bool,
    /// Member environments for logical environments.
    pub included_environments: Vec<String>,
    /// Attached policies.
    pub policies: Vec<Value>,
}

impl EnvironmentUpsert {
    /// Builds a physical environment upsert.
    #[must_use]
    pub fn physical(
        name: impl Into<String>,
        environment_type: EnvironmentType,
        description: Option<&str>,
        include_scaling: bool,
    ) -> Self {
        Self {
            name: name.into(),
            environment_type: environment_type.as_str().to_string(),
            description: description.unwrap_or_default().to_string(),
            include_scaling,
            included_environments: Vec::new(),
            policies: Vec::new(),
        }
    }

    /// Builds a logical environment upsert.
    #[must_use]
    pub fn logical(
        name: impl Into<String>,
        description: Option<&str>,
        included_environments: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            environment_type: EnvironmentType::Logical.as_str().to_string(),
            description: description.unwrap_or_default().to_string(),
            include_scaling: false,
            included_environments,
            policies: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn type_tokens_round_trip() {
        for kind in PHYSICAL_ENVIRONMENT_TYPES {
            assert_eq!(kind.as_str().parse::<EnvironmentType>().unwrap(), kind);
            assert!(kind.is_physical());
        }
        assert!(!EnvironmentType::Logical.is_physical());
        assert_eq!(
            "k8s".parse::<EnvironmentType>(),
            Err(UnknownEnvironmentType("k8s".to_string()))
        );
    }

    #[test]
    fn full_record_decodes() {
        let record: EnvironmentRecord = serde_json::from_value(json!({
            "org": "acme",
            "name": "prod-k8s",
            "type": "K8S",
            "description": "Production",
            "last_modified_at": 1_700_000_000.25,
            "last_reported_at": 1_700_000_100.0,
            "state": {"pods": 3},
            "include_scaling": true,
            "require_provenance": true,
            "tags": {"team": "core"},
            "policies": [{"name": "p1"}]
        }))
        .unwrap();
        assert_eq!(record.kind().unwrap(), EnvironmentType::K8s);
        assert_eq!(record.last_modified_at, Some(UnixTimestamp(1_700_000_000.25)));
        assert_eq!(record.tags.get("team").map(String::as_str), Some("core"));
        assert_eq!(record.policies.len(), 1);
        assert!(record.included_environments.is_none());
    }

    #[test]
    fn never_reported_stays_null() {
        let record: EnvironmentRecord = serde_json::from_value(json!({
            "name": "staging",
            "type": "server",
            "last_modified_at": 1_700_000_000.0,
            "last_reported_at": null,
            "tags": null,
            "policies": null
        }))
        .unwrap();
        assert_eq!(record.last_reported_at, None);
        assert!(record.tags.is_empty());
        assert!(record.policies.is_empty());
        assert_eq!(record.state, Value::Null);
    }

    #[test]
    fn upsert_serializes_every_field() {
        let payload =
            EnvironmentUpsert::logical("prod", None, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "name": "prod",
                "type": "logical",
                "description": "",
                "include_scaling": false,
                "included_environments": ["a", "b"],
                "policies": []
            })
        );
    }
}
