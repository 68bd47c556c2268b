// crates/kosli-client/src/error.rs
// ============================================================================
// Module: Kosli Client Errors
// Description: Typed errors for transport failures and non-2xx API responses.
// Purpose: Classify failures so callers can branch on status, not text.
// Dependencies: reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every non-2xx response becomes an [`ApiError`] carrying the status code, the
//! remote message and the request id. Transport-level failures (connect,
//! timeout, cancellation) never carry a status code and are reported through
//! the other [`ClientError`] variants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Raw bodies at or above this size are not echoed as error messages.
const MAX_RAW_MESSAGE_BYTES: usize = 500;

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// Status classification for API errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// HTTP 429.
    TooManyRequests,
    /// Any HTTP 5xx.
    ServerError,
    /// Any other non-2xx status.
    Other,
}

impl ApiErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::TooManyRequests,
            500 ..= 599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Returns true for failure classes the retry policy may replay.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TooManyRequests | Self::ServerError)
    }
}

/// Error returned by the Kosli API for a non-2xx response.
///
/// # Invariants
/// - `status` is never in the 2xx range.
/// - `message` is never empty; it falls back to the HTTP status phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message extracted from the response.
    pub message: String,
    /// `X-Request-ID` header value, when the API supplied one.
    pub request_id: Option<String>,
    /// HTTP method of the failed request.
    pub method: String,
    /// URL of the failed request.
    pub url: String,
}

impl ApiError {
    /// Builds an API error from a raw response status and body.
    #[must_use]
    pub fn from_response(
        status: u16,
        body: &[u8],
        request_id: Option<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: extract_error_message(status, body),
            request_id,
            method: method.into(),
            url: url.into(),
        }
    }

    /// Returns the status classification.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        ApiErrorKind::from_status(self.status)
    }

    /// Returns true for HTTP 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ApiErrorKind::NotFound)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kosli api error (status {}): {}", self.status, self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Kosli client errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - String payloads are user-facing and may include untrusted server text.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The request never produced a response (connect, TLS, reset).
    #[error("kosli network error: {0}")]
    Network(String),
    /// The per-request timeout elapsed.
    #[error("kosli request timed out after {0} ms")]
    Timeout(u128),
    /// The caller cancelled the operation.
    #[error("kosli request cancelled")]
    Cancelled,
    /// A 2xx response body could not be decoded.
    #[error("kosli response decode error: {0}")]
    Decode(String),
    /// The request could not be built.
    #[error("kosli request error: {0}")]
    Request(String),
    /// Client configuration was rejected.
    #[error("kosli client config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the API error when this is a non-2xx response.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true when the API answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Api(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Returns true when the operation was cancelled by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ============================================================================
// SECTION: Message Extraction
// ============================================================================

/// JSON error body shape used by the Kosli API.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// Primary message field.
    #[serde(default)]
    message: Option<String>,
    /// Alternate message field used by some endpoints.
    #[serde(default)]
    error: Option<String>,
}

/// Extracts a human-readable message from an error response body.
///
/// Preference order: JSON `message`, JSON `error`, raw body text (when short),
/// then the standard status phrase.
#[must_use]
pub fn extract_error_message(status: u16, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        let message = parsed
            .message
            .filter(|message| !message.is_empty())
            .or_else(|| parsed.error.filter(|error| !error.is_empty()));
        return message.unwrap_or_else(|| status_phrase(status));
    }
    if !body.is_empty() && body.len() < MAX_RAW_MESSAGE_BYTES {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if !text.is_empty() {
            return text;
        }
    }
    status_phrase(status)
}

/// Returns the canonical reason phrase for a status code.
fn status_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), ToString::to_string)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
