// crates/kosli-provider/tests/data_sources.rs
// ============================================================================
// Module: Data Source Tests
// Description: Read-only lookups against a fake API.
// Purpose: Verify versioned lookups, type checks and not-found errors.
// ============================================================================

//! ## Overview
//! Data sources report what the API holds, archived objects included, and
//! treat a missing object as an error.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::FakeKosli;
use common::provider;
use common::token;
use kosli_client::ApiErrorKind;
use kosli_client::Method;
use kosli_provider::AttestationTypeConfig;
use kosli_provider::ProviderError;
use kosli_provider::Resource;
use serde_json::json;

// ============================================================================
// SECTION: Custom Attestation Types
// ============================================================================

#[test]
fn attestation_type_lookup_selects_requested_version() {
    let fake = FakeKosli::new();
    let provider = provider(&fake);
    let resource = provider.custom_attestation_types();
    let mut config = AttestationTypeConfig {
        name: "coverage-check".to_string(),
        description: None,
        schema: Some(r#"{"type":"object"}"#.to_string()),
        jq_rules: vec![".line_coverage >= 80".to_string()],
    };
    let state = resource.create(&token(), &config).unwrap();
    config.jq_rules = vec![".line_coverage >= 90".to_string()];
    resource.update(&token(), &state, &config).unwrap();

    let latest = provider.data_sources().custom_attestation_type(&token(), "coverage-check", None).unwrap();
    let first = provider.data_sources().custom_attestation_type(&token(), "coverage-check", Some(1)).unwrap();

    assert_eq!(latest.version, Some(2));
    assert_eq!(latest.jq_rules, vec![".line_coverage >= 90"]);
    assert_eq!(first.version, Some(1));
    assert_eq!(first.jq_rules, vec![".line_coverage >= 80"]);
    assert_eq!(first.org.as_deref(), Some("acme"));
    let versioned = fake.calls().into_iter().filter(|call| !call.query.is_empty()).collect::<Vec<_>>();
    assert_eq!(versioned.len(), 1);
    assert_eq!(versioned[0].query, vec![("version".to_string(), "1".to_string())]);
}

#[test]
fn archived_types_are_reported_not_hidden() {
    let fake = FakeKosli::new();
    let provider = provider(&fake);
    let resource = provider.custom_attestation_types();
    let config = AttestationTypeConfig {
        name: "retired".to_string(),
        ..Default::default()
    };
    let state = resource.create(&token(), &config).unwrap();
    resource.delete(&token(), &state).unwrap();

    let data = provider.data_sources().custom_attestation_type(&token(), "retired", None).unwrap();
    let listed = provider.data_sources().custom_attestation_types(&token()).unwrap();

    assert!(data.archived);
    assert_eq!(listed.len(), 1);
    assert!(listed[0].archived);
}

#[test]
fn missing_type_is_an_error() {
    let fake = FakeKosli::new();

    let err = provider(&fake).data_sources().custom_attestation_type(&token(), "nope", None).unwrap_err();

    assert_eq!(err.api().map(kosli_client::ApiError::kind), Some(ApiErrorKind::NotFound));
    assert_eq!(
        err.to_string(),
        "could not look up custom attestation type \"nope\": custom attestation type not found"
    );
}

#[test]
fn lookups_validate_names_before_calling() {
    let fake = FakeKosli::new();

    let err = provider(&fake).data_sources().environment(&token(), "bad name").unwrap_err();

    assert!(matches!(err, ProviderError::Validation { .. }));
    assert_eq!(fake.call_count(), 0);
}

// ============================================================================
// SECTION: Environments
// ============================================================================

#[test]
fn environment_lookup_exposes_server_fields() {
    let fake = FakeKosli::new();
    fake.seed_environment(json!({
        "org": "acme",
        "name": "prod-k8s",
        "type": "K8S",
        "description": "Production cluster",
        "last_modified_at": 1_700_000_100.25,
        "last_reported_at": null,
        "require_provenance": true,
        "tags": {"team": "platform"},
        "state": {"compliant": false},
        "policies": [{"name": "prod-policy"}],
    }));

    let data = provider(&fake).data_sources().environment(&token(), "prod-k8s").unwrap();

    assert_eq!(data.environment_type, "K8S");
    assert_eq!(data.last_modified_at.map(|at| at.seconds()), Some(1_700_000_100.25));
    assert_eq!(data.last_reported_at, None);
    assert!(data.require_provenance);
    assert_eq!(data.tags.get("team").map(String::as_str), Some("platform"));
    assert_eq!(data.state, json!({"compliant": false}));
    assert_eq!(data.policies.len(), 1);
}

#[test]
fn environment_list_includes_every_type() {
    let fake = FakeKosli::new();
    fake.seed_environment(json!({"name": "prod-k8s", "type": "K8S"}));
    fake.seed_environment(json!({"name": "all-prod", "type": "logical"}));

    let listed = provider(&fake).data_sources().environments(&token()).unwrap();

    let names: Vec<&str> = listed.iter().map(|env| env.name.as_str()).collect();
    assert_eq!(names, vec!["all-prod", "prod-k8s"]);
    assert_eq!(fake.calls_with(Method::Get)[0].path, "/environments/acme");
}

#[test]
fn logical_lookup_reports_members_and_rejects_physical() {
    let fake = FakeKosli::new();
    fake.seed_environment(json!({"name": "prod-k8s", "type": "K8S"}));
    fake.seed_environment(json!({"name": "all-prod", "type": "logical"}));
    let data_sources = provider(&fake).data_sources();

    let logical = data_sources.logical_environment(&token(), "all-prod").unwrap();
    let err = data_sources.logical_environment(&token(), "prod-k8s").unwrap_err();

    assert!(logical.included_environments.is_empty());
    assert!(matches!(err, ProviderError::UnexpectedType { .. }));
}

#[test]
fn list_failures_name_the_collection() {
    let fake = FakeKosli::new();
    fake.fail_next(Method::Get, "/environments/acme", 401, r#"{"message":"invalid token"}"#);

    let err = provider(&fake).data_sources().environments(&token()).unwrap_err();

    assert_eq!(err.to_string(), "could not list environments: invalid token");
}
