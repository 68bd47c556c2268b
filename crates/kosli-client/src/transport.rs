// crates/kosli-client/src/transport.rs
// ============================================================================
// Module: Kosli Transport Interface
// Description: Backend-agnostic request/response model and transport trait.
// Purpose: Let the typed client run over HTTP or an in-memory substitute.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`Transport`] executes one logical [`ApiRequest`] and returns the 2xx
//! [`ApiResponse`] or a classified [`ClientError`]. Implementations must be safe
//! for concurrent use: they hold no request-scoped mutable state, so one
//! transport can serve independent operations from many threads.
//!
//! Cancellation is cooperative. Every call receives a [`CancellationToken`];
//! implementations stop waiting once it fires and return
//! [`ClientError::Cancelled`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Granularity used when sleeping or waiting while watching for cancellation.
pub(crate) const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Shared cancellation flag passed into every blocking call.
///
/// # Invariants
/// - Once cancelled, a token stays cancelled.
/// - Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared cancellation state.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every operation observing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`CancellationToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with [`ClientError::Cancelled`] when the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] when cancelled.
    pub fn check(&self) -> Result<(), ClientError> {
        if self.is_cancelled() { Err(ClientError::Cancelled) } else { Ok(()) }
    }

    /// Sleeps for `duration`, waking early when the token fires.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] when cancelled before the sleep ends.
    pub fn sleep(&self, duration: Duration) -> Result<(), ClientError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(CANCEL_POLL_INTERVAL));
        }
    }
}

// ============================================================================
// SECTION: Request Model
// ============================================================================

/// HTTP methods used by the Kosli API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Returns true for methods that are idempotent by HTTP semantics.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        !matches!(self, Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name advertised to the server.
    pub file_name: String,
    /// MIME type of the content.
    pub content_type: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

/// A `multipart/form-data` body.
///
/// # Invariants
/// - Text fields and files are sent in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    /// Text fields as `(name, value)` pairs.
    pub fields: Vec<(String, String)>,
    /// File parts.
    pub files: Vec<FilePart>,
}

impl MultipartBody {
    /// Returns the value of a text field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(field, _)| field == name).map(|(_, value)| value.as_str())
    }

    /// Returns a file part by field name.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|file| file.field == name)
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// JSON body sent as `application/json`.
    Json(Value),
    /// Multipart form body.
    Multipart(MultipartBody),
}

/// One logical API request, independent of the wire transport.
///
/// # Invariants
/// - `segments` are raw path segments relative to the API root; transports
///   are responsible for percent-encoding them.
/// - `idempotent` defaults to the method's HTTP semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path segments below the API root.
    pub segments: Vec<String>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Whether replaying the request is safe.
    pub idempotent: bool,
}

impl ApiRequest {
    /// Creates a request with no body.
    #[must_use]
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: RequestBody::Empty,
            idempotent: method.is_idempotent(),
        }
    }

    /// Attaches a body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Overrides the idempotency flag.
    #[must_use]
    pub const fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Returns the unencoded path (`/a/b/c`) for logging and matching.
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

// ============================================================================
// SECTION: Response Model
// ============================================================================

/// A successful (2xx) API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// `X-Request-ID` header value, when present.
    pub request_id: Option<String>,
}

impl ApiResponse {
    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| ClientError::Decode(format!("failed to decode response: {err}")))
    }
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Executes API requests.
pub trait Transport: Send + Sync {
    /// Executes a request and returns its 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for non-2xx responses and the other
    /// [`ClientError`] variants for transport failures or cancellation.
    fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        (**self).execute(cancel, request)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
