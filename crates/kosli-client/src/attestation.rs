// crates/kosli-client/src/attestation.rs
// ============================================================================
// Module: Custom Attestation Type Transformers
// Description: Wire and user-facing models for custom attestation types.
// Purpose: Translate versioned, evaluator-based payloads to a flat model.
// Dependencies: serde, serde_json, crate::{transport, wire}
// ============================================================================

//! ## Overview
//! The API stores every changing write as a new version. Reads return either a
//! `versions[]` history, a flat `evaluator`/`schema` pair, or both, depending
//! on the API iteration. [`CustomAttestationType::from_wire`] surfaces only the
//! newest version: the entry with the highest `version` number, whatever the
//! array order, falling back to the top-level fields for anything the newest
//! version lacks.
//!
//! Writes go out as `multipart/form-data`: a `data_json` text field with the
//! metadata and evaluator, plus an optional `type_schema` file part holding the
//! raw schema text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::transport::FilePart;
use crate::transport::MultipartBody;
use crate::wire::UnixTimestamp;
use crate::wire::null_as_default;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Evaluator content type carrying jq rules.
pub const JQ_CONTENT_TYPE: &str = "jq";
/// Multipart field holding the JSON metadata.
pub const DATA_JSON_FIELD: &str = "data_json";
/// Multipart file field holding the schema text.
pub const TYPE_SCHEMA_FIELD: &str = "type_schema";
/// File name advertised for the schema part.
pub const SCHEMA_FILE_NAME: &str = "schema.json";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Rule evaluator as sent and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluator {
    /// Rule language identifier, `jq` for jq rules.
    pub content_type: String,
    /// Ordered rule expressions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<String>,
}

impl Evaluator {
    /// Builds a jq evaluator.
    #[must_use]
    pub fn jq(rules: Vec<String>) -> Self {
        Self {
            content_type: JQ_CONTENT_TYPE.to_string(),
            rules,
        }
    }

    /// Returns the rules when this is a jq evaluator, otherwise nothing.
    #[must_use]
    pub fn jq_rules(&self) -> Vec<String> {
        if self.content_type == JQ_CONTENT_TYPE { self.rules.clone() } else { Vec::new() }
    }
}

/// One entry of the server-side version history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireVersion {
    /// Monotonic version number.
    #[serde(default)]
    pub version: u64,
    /// Creation time of this version.
    #[serde(default)]
    pub timestamp: Option<UnixTimestamp>,
    /// Schema snapshot, either a JSON string or an embedded document.
    #[serde(default)]
    pub type_schema: Option<Value>,
    /// Evaluator snapshot.
    #[serde(default)]
    pub evaluator: Option<Evaluator>,
    /// Author of the version.
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Custom attestation type as returned by `GET`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireAttestationType {
    /// Type name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Soft-delete marker.
    #[serde(default, deserialize_with = "null_as_default")]
    pub archived: bool,
    /// Owning organization.
    #[serde(default)]
    pub org: Option<String>,
    /// Version history.
    #[serde(default, deserialize_with = "null_as_default")]
    pub versions: Vec<WireVersion>,
    /// Flat evaluator used by some API iterations.
    #[serde(default)]
    pub evaluator: Option<Evaluator>,
    /// Flat schema used by some API iterations.
    #[serde(default)]
    pub schema: Option<Value>,
    /// Flat schema under the version field name.
    #[serde(default)]
    pub type_schema: Option<Value>,
}

impl WireAttestationType {
    /// Returns the version with the highest number.
    #[must_use]
    pub fn latest_version(&self) -> Option<&WireVersion> {
        self.versions.iter().max_by_key(|entry| entry.version)
    }
}

// ============================================================================
// SECTION: User Model
// ============================================================================

/// User-facing custom attestation type.
///
/// # Invariants
/// - `schema` and `jq_rules` reflect the newest server version only.
/// - `schema` text is kept verbatim, even when it is not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttestationType {
    /// Type name.
    pub name: String,
    /// Description; `None` when absent or empty.
    pub description: Option<String>,
    /// JSON schema text.
    pub schema: Option<String>,
    /// Ordered jq rules.
    pub jq_rules: Vec<String>,
    /// Server-derived soft-delete marker.
    pub archived: bool,
    /// Owning organization.
    pub org: Option<String>,
    /// Number of the surfaced version, when the API returned history.
    pub version: Option<u64>,
}

impl CustomAttestationType {
    /// Converts a wire record into the user model.
    #[must_use]
    pub fn from_wire(wire: WireAttestationType) -> Self {
        let latest = wire.latest_version();
        let schema = latest
            .and_then(|entry| entry.type_schema.as_ref())
            .and_then(schema_text)
            .or_else(|| wire.schema.as_ref().and_then(schema_text))
            .or_else(|| wire.type_schema.as_ref().and_then(schema_text));
        let jq_rules = latest
            .and_then(|entry| entry.evaluator.as_ref())
            .or(wire.evaluator.as_ref())
            .map(Evaluator::jq_rules)
            .unwrap_or_default();
        let version = latest.map(|entry| entry.version);
        Self {
            name: wire.name,
            description: wire.description.filter(|text| !text.is_empty()),
            schema,
            jq_rules,
            archived: wire.archived,
            org: wire.org,
            version,
        }
    }
}

impl From<WireAttestationType> for CustomAttestationType {
    fn from(wire: WireAttestationType) -> Self {
        Self::from_wire(wire)
    }
}

/// Converts a wire schema value into schema text.
///
/// Strings are taken verbatim; embedded documents are serialized compactly.
fn schema_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// SECTION: Write Request
// ============================================================================

/// Desired state sent on create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationTypeRequest {
    /// Type name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// JSON schema text, uploaded as a file part.
    pub schema: Option<String>,
    /// Ordered jq rules.
    pub jq_rules: Vec<String>,
}

/// `data_json` payload.
#[derive(Debug, Serialize)]
struct WritePayload<'a> {
    /// Type name.
    name: &'a str,
    /// Description; empty when unset.
    description: &'a str,
    /// jq evaluator.
    evaluator: Evaluator,
}

impl AttestationTypeRequest {
    /// Returns the JSON metadata payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] when the payload cannot be serialized.
    pub fn to_wire(&self) -> Result<Value, ClientError> {
        serde_json::to_value(self.payload())
            .map_err(|err| ClientError::Request(format!("failed to marshal data: {err}")))
    }

    /// Builds the multipart body for the write call.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] when the payload cannot be serialized.
    pub fn to_multipart(&self) -> Result<MultipartBody, ClientError> {
        let data_json = serde_json::to_string(&self.payload())
            .map_err(|err| ClientError::Request(format!("failed to marshal data: {err}")))?;
        let mut body = MultipartBody {
            fields: vec![(DATA_JSON_FIELD.to_string(), data_json)],
            files: Vec::new(),
        };
        if let Some(schema) = self.schema.as_deref().filter(|schema| !schema.is_empty()) {
            body.files.push(FilePart {
                field: TYPE_SCHEMA_FIELD.to_string(),
                file_name: SCHEMA_FILE_NAME.to_string(),
                content_type: "application/json".to_string(),
                content: schema.as_bytes().to_vec(),
            });
        }
        Ok(body)
    }

    /// Borrowed payload view.
    fn payload(&self) -> WritePayload<'_> {
        WritePayload {
            name: &self.name,
            description: self.description.as_deref().unwrap_or_default(),
            evaluator: Evaluator::jq(self.jq_rules.clone()),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
