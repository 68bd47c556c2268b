// crates/kosli-provider/src/semantic.rs
// ============================================================================
// Module: Semantic JSON Comparison
// Description: Structural equality for JSON schema text.
// Purpose: Keep plans stable when the API reformats stored schemas.
// Dependencies: bigdecimal, serde_json
// ============================================================================

//! ## Overview
//! Two schema texts are equal when they parse to the same JSON value:
//! whitespace, object key order and number formatting are ignored, array order
//! is significant. When either side fails to parse, the comparison falls back
//! to exact string equality, so malformed text never panics and never compares
//! equal to a different string.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Returns true when both texts encode the same JSON value.
#[must_use]
pub fn semantically_equal(left: &str, right: &str) -> bool {
    match (serde_json::from_str::<Value>(left), serde_json::from_str::<Value>(right)) {
        (Ok(left), Ok(right)) => values_equal(&left, &right),
        _ => left == right,
    }
}

/// Compares optional schema texts; two absent values are equal.
#[must_use]
pub fn optional_semantically_equal(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => semantically_equal(left, right),
        _ => false,
    }
}

/// Structural equality over parsed JSON values.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::String(left), Value::String(right)) => left == right,
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left.iter().zip(right).all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => false,
    }
}

/// Picks the schema text to keep after a read.
///
/// The prior text survives when it is semantically equal to the fetched one,
/// so a server-side reformat never shows up as a change.
#[must_use]
pub fn reconcile_schema(prior: Option<&str>, fetched: Option<String>) -> Option<String> {
    match (prior, fetched) {
        (Some(prior), Some(fetched)) if semantically_equal(prior, &fetched) => {
            Some(prior.to_string())
        }
        (_, fetched) => fetched,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compares numbers by decimal value so `1` equals `1.0`.
fn numbers_equal(left: &Number, right: &Number) -> bool {
    if left == right {
        return true;
    }
    match (decimal_from_number(left), decimal_from_number(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Parses a JSON number into `BigDecimal` with a stable string representation.
fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_and_whitespace_are_ignored() {
        assert!(semantically_equal(
            r#"{"type":"object","properties":{"a":1}}"#,
            r#"{ "properties": { "a": 1 }, "type": "object" }"#,
        ));
    }

    #[test]
    fn different_values_are_unequal() {
        assert!(!semantically_equal(r#"{"type":"object"}"#, r#"{"type":"array"}"#));
    }

    #[test]
    fn array_order_matters() {
        assert!(!semantically_equal("[1,2]", "[2,1]"));
        assert!(semantically_equal("[1, 2]", "[1,2]"));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(semantically_equal(r#"{"minimum": 1}"#, r#"{"minimum": 1.0}"#));
        assert!(semantically_equal("[1e2]", "[100]"));
        assert!(!semantically_equal("[1]", "[1.5]"));
    }

    #[test]
    fn malformed_json_falls_back_to_exact_text() {
        assert!(semantically_equal("{not json", "{not json"));
        assert!(!semantically_equal("{not json", "{not  json"));
        assert!(!semantically_equal("{not json", "{}"));
    }

    #[test]
    fn extra_keys_are_unequal() {
        assert!(!semantically_equal(r#"{"a":1}"#, r#"{"a":1,"b":2}"#));
        assert!(!semantically_equal(r#"{"a":1,"b":2}"#, r#"{"a":1}"#));
    }

    #[test]
    fn optional_comparison_treats_absence_as_a_value() {
        assert!(optional_semantically_equal(None, None));
        assert!(!optional_semantically_equal(Some("{}"), None));
        assert!(optional_semantically_equal(Some("{ }"), Some("{}")));
    }

    #[test]
    fn reconcile_keeps_prior_text_when_equal() {
        let prior = r#"{ "type": "object" }"#;
        assert_eq!(
            reconcile_schema(Some(prior), Some(r#"{"type":"object"}"#.to_string())).as_deref(),
            Some(prior)
        );
        assert_eq!(
            reconcile_schema(Some(prior), Some(r#"{"type":"array"}"#.to_string())).as_deref(),
            Some(r#"{"type":"array"}"#)
        );
        assert_eq!(reconcile_schema(Some(prior), None), None);
        assert_eq!(reconcile_schema(None, Some("{}".to_string())).as_deref(), Some("{}"));
    }
}
