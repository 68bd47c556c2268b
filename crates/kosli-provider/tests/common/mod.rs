// crates/kosli-provider/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-memory Kosli API implementing the client transport.
// Purpose: Drive resource handlers end to end without a network.
// Dependencies: kosli-client, serde_json
// ============================================================================

//! ## Overview
//! [`FakeKosli`] behaves like the parts of the Kosli API the provider uses:
//! - attestation type writes answer `201 OK`, create a new version only when
//!   the payload changed, and store schemas as parsed JSON so reads come back
//!   compact with sorted keys
//! - environment upserts answer `200 OK` and GETs omit
//!   `included_environments`, as the real endpoint does
//! - archive calls soft-delete; missing objects answer 404
//!
//! Every request is recorded, and failures can be injected per method and
//! path.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use kosli_client::ApiError;
use kosli_client::ApiRequest;
use kosli_client::ApiResponse;
use kosli_client::CancellationToken;
use kosli_client::ClientError;
use kosli_client::KosliClient;
use kosli_client::Method;
use kosli_client::RequestBody;
use kosli_client::Transport;
use kosli_provider::KosliProvider;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Organization used by every fixture.
pub const ORG: &str = "acme";
/// Base URL reported in fake error records.
const FAKE_ROOT: &str = "https://app.kosli.com/api/v2";
/// First timestamp handed out by the fake clock.
const CLOCK_START: f64 = 1_700_000_000.0;

// ============================================================================
// SECTION: Recorded Calls
// ============================================================================

/// A request observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// HTTP method.
    pub method: Method,
    /// Unencoded path below the API root.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
}

/// A failure answered instead of the next matching request.
#[derive(Debug, Clone)]
struct InjectedFailure {
    /// Method to match.
    method: Method,
    /// Exact path to match.
    path: String,
    /// Status to answer.
    status: u16,
    /// Response body.
    body: String,
}

// ============================================================================
// SECTION: Stored Objects
// ============================================================================

/// One stored custom attestation type.
#[derive(Debug, Clone)]
struct StoredType {
    /// Latest description.
    description: String,
    /// Soft-delete marker.
    archived: bool,
    /// Version history, oldest first.
    versions: Vec<StoredVersion>,
}

/// One stored attestation type version.
#[derive(Debug, Clone, PartialEq)]
struct StoredVersion {
    /// Version number, starting at 1.
    number: u64,
    /// Creation time.
    timestamp: f64,
    /// Parsed schema, when one was sent.
    schema: Option<Value>,
    /// jq rules.
    rules: Vec<String>,
}

/// One stored environment.
#[derive(Debug, Clone)]
struct StoredEnvironment {
    /// Record as returned by GET.
    record: Value,
    /// Membership as last written; never returned by GET.
    included_environments: Vec<String>,
}

/// Mutable fake state.
#[derive(Debug, Default)]
struct FakeState {
    /// Attestation types by name.
    types: BTreeMap<String, StoredType>,
    /// Environments by name.
    environments: BTreeMap<String, StoredEnvironment>,
    /// Every request in arrival order.
    calls: Vec<RecordedCall>,
    /// Pending injected failures.
    failures: VecDeque<InjectedFailure>,
    /// Monotonic clock in unix seconds.
    clock: f64,
}

impl FakeState {
    /// Advances and returns the clock.
    fn tick(&mut self) -> f64 {
        if self.clock < CLOCK_START {
            self.clock = CLOCK_START;
        }
        self.clock += 1.0;
        self.clock
    }
}

// ============================================================================
// SECTION: Fake API
// ============================================================================

/// In-memory Kosli API for organization [`ORG`].
#[derive(Debug, Default)]
pub struct FakeKosli {
    /// Shared state.
    state: Mutex<FakeState>,
}

impl FakeKosli {
    /// Creates an empty fake.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Returns the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Returns recorded calls with the given method.
    pub fn calls_with(&self, method: Method) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|call| call.method == method).collect()
    }

    /// Answers the next `method` request on `path` with `status`.
    pub fn fail_next(&self, method: Method, path: &str, status: u16, body: &str) {
        self.state.lock().unwrap().failures.push_back(InjectedFailure {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        });
    }

    /// Returns the number of versions stored for an attestation type.
    pub fn version_count(&self, name: &str) -> usize {
        self.state.lock().unwrap().types.get(name).map_or(0, |stored| stored.versions.len())
    }

    /// Returns whether an attestation type is archived.
    pub fn type_archived(&self, name: &str) -> Option<bool> {
        self.state.lock().unwrap().types.get(name).map(|stored| stored.archived)
    }

    /// Returns whether an environment is archived.
    pub fn environment_archived(&self, name: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .environments
            .get(name)
            .map(|stored| stored.record["archived"] == Value::Bool(true))
    }

    /// Returns the membership last written for an environment.
    pub fn stored_members(&self, name: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .environments
            .get(name)
            .map(|stored| stored.included_environments.clone())
    }

    /// Seeds an environment record verbatim.
    pub fn seed_environment(&self, record: Value) {
        let name = record["name"].as_str().unwrap_or_default().to_string();
        let included_environments = record["included_environments"]
            .as_array()
            .map(|members| {
                members.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
            })
            .unwrap_or_default();
        self.state.lock().unwrap().environments.insert(name, StoredEnvironment {
            record,
            included_environments,
        });
    }

    /// Seeds an attestation type GET body verbatim.
    pub fn seed_attestation_type(&self, name: &str, description: &str, versions: &[(u64, Option<Value>, Vec<String>)]) {
        let versions = versions
            .iter()
            .map(|(number, schema, rules)| StoredVersion {
                number: *number,
                timestamp: CLOCK_START,
                schema: schema.clone(),
                rules: rules.clone(),
            })
            .collect();
        self.state.lock().unwrap().types.insert(name.to_string(), StoredType {
            description: description.to_string(),
            archived: false,
            versions,
        });
    }

    /// Records a snapshot report for an environment.
    pub fn report(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let now = state.tick();
        if let Some(stored) = state.environments.get_mut(name) {
            stored.record["last_reported_at"] = json!(now);
        }
    }

    /// Routes one request.
    fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: request.method,
            path: request.path(),
            query: request.query.clone(),
            body: request.body.clone(),
        });
        let path = request.path();
        if let Some(index) = state
            .failures
            .iter()
            .position(|failure| failure.method == request.method && failure.path == path)
        {
            let failure = state.failures.remove(index).unwrap();
            return Err(api_error(request, failure.status, failure.body.as_bytes()));
        }
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["custom-attestation-types", ORG]) => {
                let records: Vec<Value> =
                    state.types.iter().map(|(name, stored)| type_record(name, stored, None)).collect();
                ok(200, &Value::Array(records))
            }
            (Method::Post, ["custom-attestation-types", ORG]) => write_type(&mut state, request),
            (Method::Get, ["custom-attestation-types", ORG, name]) => {
                let version = request
                    .query
                    .iter()
                    .find(|(key, _)| key == "version")
                    .and_then(|(_, value)| value.parse::<u64>().ok());
                match state.types.get(*name) {
                    Some(stored) if version.is_none_or(|number| {
                        stored.versions.iter().any(|entry| entry.number == number)
                    }) =>
                    {
                        ok(200, &type_record(name, stored, version))
                    }
                    _ => Err(not_found(request, "custom attestation type")),
                }
            }
            (Method::Put, ["custom-attestation-types", ORG, name, "archive"]) => {
                match state.types.get_mut(*name) {
                    Some(stored) => {
                        stored.archived = true;
                        ok(200, &json!("OK"))
                    }
                    None => Err(not_found(request, "custom attestation type")),
                }
            }
            (Method::Get, ["environments", ORG]) => {
                let records: Vec<Value> =
                    state.environments.values().map(|stored| stored.record.clone()).collect();
                ok(200, &Value::Array(records))
            }
            (Method::Put, ["environments", ORG]) => upsert_environment(&mut state, request),
            (Method::Get, ["environments", ORG, name]) => match state.environments.get(*name) {
                Some(stored) => ok(200, &stored.record),
                None => Err(not_found(request, "environment")),
            },
            (Method::Put, ["environments", ORG, name, "archive"]) => {
                match state.environments.get_mut(*name) {
                    Some(stored) => {
                        stored.record["archived"] = Value::Bool(true);
                        ok(200, &json!("OK"))
                    }
                    None => Err(not_found(request, "environment")),
                }
            }
            _ => Err(api_error(request, 404, br#"{"message":"route not found"}"#)),
        }
    }
}

impl Transport for FakeKosli {
    fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        cancel.check()?;
        self.handle(request)
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Stores an attestation type write, versioning only changed payloads.
fn write_type(state: &mut FakeState, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
    let RequestBody::Multipart(body) = &request.body else {
        return Err(api_error(request, 400, br#"{"message":"expected multipart body"}"#));
    };
    let Some(data) = body.field("data_json").and_then(|text| serde_json::from_str::<Value>(text).ok())
    else {
        return Err(api_error(request, 400, br#"{"message":"data_json is required"}"#));
    };
    let schema = match body.file("type_schema") {
        Some(file) => match serde_json::from_slice::<Value>(&file.content) {
            Ok(value) => Some(value),
            Err(_) => return Err(api_error(request, 400, br#"{"message":"schema is not valid JSON"}"#)),
        },
        None => None,
    };
    let name = data["name"].as_str().unwrap_or_default().to_string();
    let description = data["description"].as_str().unwrap_or_default().to_string();
    let rules: Vec<String> = data["evaluator"]["rules"]
        .as_array()
        .map(|rules| rules.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
        .unwrap_or_default();
    let now = state.tick();
    let stored = state.types.entry(name).or_insert_with(|| StoredType {
        description: String::new(),
        archived: false,
        versions: Vec::new(),
    });
    let unchanged = stored.versions.last().is_some_and(|latest| {
        latest.schema == schema && latest.rules == rules && stored.description == description
    });
    stored.archived = false;
    if !unchanged {
        let number = stored.versions.last().map_or(1, |latest| latest.number + 1);
        stored.description = description;
        stored.versions.push(StoredVersion {
            number,
            timestamp: now,
            schema,
            rules,
        });
    }
    ok(201, &json!("OK"))
}

/// Stores a full-state environment upsert.
fn upsert_environment(state: &mut FakeState, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
    let RequestBody::Json(body) = &request.body else {
        return Err(api_error(request, 400, br#"{"message":"expected JSON body"}"#));
    };
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let environment_type = body["type"].as_str().unwrap_or_default().to_string();
    let included_environments: Vec<String> = body["included_environments"]
        .as_array()
        .map(|members| members.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
        .unwrap_or_default();
    for member in &included_environments {
        let physical = state.environments.get(member).is_some_and(|stored| {
            stored.record["type"] != "logical" && stored.record["archived"] != Value::Bool(true)
        });
        if !physical {
            let message = format!(r#"{{"message":"environment '{member}' is not a physical environment"}}"#);
            return Err(api_error(request, 400, message.as_bytes()));
        }
    }
    let now = state.tick();
    let previous = state.environments.get(&name).map(|stored| stored.record.clone());
    let last_reported_at = previous.as_ref().map_or(Value::Null, |record| record["last_reported_at"].clone());
    let record = json!({
        "org": ORG,
        "name": name,
        "type": environment_type,
        "description": body["description"],
        "include_scaling": body["include_scaling"],
        "last_modified_at": now,
        "last_reported_at": last_reported_at,
        "state": null,
        "tags": {},
        "policies": body["policies"],
        "require_provenance": false,
        "archived": false,
    });
    state.environments.insert(name, StoredEnvironment {
        record,
        included_environments,
    });
    ok(200, &json!("OK"))
}

// ============================================================================
// SECTION: Wire Helpers
// ============================================================================

/// Renders a stored type as the API returns it.
fn type_record(name: &str, stored: &StoredType, version: Option<u64>) -> Value {
    let versions: Vec<Value> = stored
        .versions
        .iter()
        .filter(|entry| version.is_none_or(|number| entry.number == number))
        .rev()
        .map(|entry| {
            json!({
                "version": entry.number,
                "timestamp": entry.timestamp,
                "type_schema": entry.schema,
                "evaluator": { "content_type": "jq", "rules": entry.rules },
                "created_by": "fake",
            })
        })
        .collect();
    json!({
        "name": name,
        "description": stored.description,
        "archived": stored.archived,
        "org": ORG,
        "versions": versions,
    })
}

/// Builds a successful response.
fn ok(status: u16, body: &Value) -> Result<ApiResponse, ClientError> {
    Ok(ApiResponse {
        status,
        body: body.to_string().into_bytes(),
        request_id: Some("fake-request".to_string()),
    })
}

/// Builds an API error for `request`.
fn api_error(request: &ApiRequest, status: u16, body: &[u8]) -> ClientError {
    ClientError::Api(ApiError::from_response(
        status,
        body,
        Some("fake-request".to_string()),
        request.method.as_str(),
        format!("{FAKE_ROOT}{}", request.path()),
    ))
}

/// Builds a 404 for a missing object.
fn not_found(request: &ApiRequest, kind: &str) -> ClientError {
    let body = format!(r#"{{"message":"{kind} not found"}}"#);
    api_error(request, 404, body.as_bytes())
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Returns a provider bound to `fake`.
pub fn provider(fake: &Arc<FakeKosli>) -> KosliProvider {
    let transport: Arc<dyn Transport> = fake.clone();
    KosliProvider::from_client(KosliClient::new(transport, ORG).unwrap())
}

/// Returns a never-cancelled token.
pub fn token() -> CancellationToken {
    CancellationToken::new()
}
