// crates/kosli-provider/src/validation.rs
// ============================================================================
// Module: Desired-State Validation
// Description: Local checks run before any network call.
// Purpose: Reject malformed names, schemas and environment types early.
// Dependencies: kosli-client, serde_json
// ============================================================================

//! ## Overview
//! Names must start with a letter or digit and contain only letters, digits,
//! `.`, `-`, `_` and `~`. Schema text must parse as JSON. Physical environment
//! types must be one of the known backends. Membership rules for logical
//! environments beyond self-inclusion are left to the server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kosli_client::EnvironmentType;
use kosli_client::PHYSICAL_ENVIRONMENT_TYPES;
use serde_json::Value;

use crate::error::ProviderError;
use crate::error::ResourceKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters allowed after the first one in a name, besides alphanumerics.
const NAME_PUNCTUATION: [char; 4] = ['.', '-', '_', '~'];

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Validates a resource name.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] when the name is empty or uses
/// characters outside the allowed set.
pub fn validate_name(kind: ResourceKind, name: &str) -> Result<(), ProviderError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(kind, name, "name cannot be empty"));
    };
    if !first.is_ascii_alphanumeric() {
        return Err(invalid(kind, name, "name must start with a letter or number"));
    }
    if chars.any(|ch| !ch.is_ascii_alphanumeric() && !NAME_PUNCTUATION.contains(&ch)) {
        return Err(invalid(
            kind,
            name,
            "name may only contain letters, numbers, '.', '-', '_' and '~'",
        ));
    }
    Ok(())
}

/// Validates that schema text parses as JSON.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] when the schema is not valid JSON.
pub fn validate_schema(kind: ResourceKind, name: &str, schema: &str) -> Result<(), ProviderError> {
    serde_json::from_str::<Value>(schema)
        .map(|_| ())
        .map_err(|err| invalid(kind, name, &format!("schema is not valid JSON: {err}")))
}

/// Parses a physical environment type token.
///
/// # Errors
///
/// Returns [`ProviderError::Validation`] for unknown tokens and for `logical`.
pub fn parse_physical_type(name: &str, token: &str) -> Result<EnvironmentType, ProviderError> {
    match token.parse::<EnvironmentType>() {
        Ok(kind) if kind.is_physical() => Ok(kind),
        _ => {
            let allowed: Vec<&str> =
                PHYSICAL_ENVIRONMENT_TYPES.iter().map(|kind| kind.as_str()).collect();
            Err(invalid(
                ResourceKind::Environment,
                name,
                &format!("type \"{token}\" must be one of: {}", allowed.join(", ")),
            ))
        }
    }
}

/// Builds a validation error.
pub(crate) fn invalid(kind: ResourceKind, name: &str, message: &str) -> ProviderError {
    ProviderError::Validation {
        kind,
        name: name.to_string(),
        message: message.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
