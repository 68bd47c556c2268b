// crates/kosli-client/src/http.rs
// ============================================================================
// Module: Kosli HTTP Transport
// Description: Blocking reqwest transport with auth, limits, and retries.
// Purpose: Execute API requests against the Kosli REST API.
// Dependencies: reqwest, url, tracing, crate::{error, retry, transport}
// ============================================================================

//! ## Overview
//! [`HttpTransport`] sends every request with a bearer token and a
//! product-identifying user agent, converts non-2xx responses into
//! [`ApiError`] values and replays idempotent requests on 5xx/429 according
//! to its [`RetryPolicy`].
//! Invariants:
//! - Redirects are not followed.
//! - Response bodies are capped at [`MAX_RESPONSE_BYTES`].
//! - Each attempt runs on a worker thread so the caller can stop waiting as
//!   soon as its [`CancellationToken`] fires; the abandoned attempt is bounded
//!   by the per-request timeout.
//!
//! Security posture: the API token is never logged and `Debug` output redacts it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::multipart::Part;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::RETRY_AFTER;
use reqwest::redirect::Policy;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::error::ApiError;
use crate::error::ClientError;
use crate::retry::RetryPolicy;
use crate::transport::ApiRequest;
use crate::transport::ApiResponse;
use crate::transport::CANCEL_POLL_INTERVAL;
use crate::transport::CancellationToken;
use crate::transport::Method;
use crate::transport::RequestBody;
use crate::transport::Transport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default Kosli API base URL (EU region).
pub const DEFAULT_BASE_URL: &str = "https://app.kosli.com";
/// Kosli API base URL for the US region.
pub const US_BASE_URL: &str = "https://app.us.kosli.com";
/// Default API path below the base URL.
pub const DEFAULT_API_PATH: &str = "/api/v2";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default user agent when no provider version is known.
pub const DEFAULT_USER_AGENT: &str = "terraform-provider-kosli/dev";
/// Maximum accepted response body size in bytes.
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;
/// Header carrying the server-side request identifier.
const REQUEST_ID_HEADER: &str = "x-request-id";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`HttpTransport`].
///
/// # Invariants
/// - `api_token` is non-empty.
/// - `base_url` is an absolute `http(s)` URL.
/// - `timeout` applies to each attempt, not to the whole retry sequence.
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// API base URL, for example `https://app.kosli.com`.
    pub base_url: String,
    /// API path appended to the base URL; empty targets the base URL directly.
    pub api_path: String,
    /// Bearer token.
    pub api_token: String,
    /// User agent header value.
    pub user_agent: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retry policy for idempotent requests.
    pub retry: RetryPolicy,
}

impl HttpTransportConfig {
    /// Creates a configuration with default endpoint, timeout and retry policy.
    #[must_use]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            api_token: api_token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("base_url", &self.base_url)
            .field("api_path", &self.api_path)
            .field("api_token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Blocking HTTP transport for the Kosli API.
///
/// # Invariants
/// - `api_root` already contains the API path; request segments are appended.
/// - The transport holds no per-request mutable state.
pub struct HttpTransport {
    /// Shared reqwest client (connection pool).
    client: Client,
    /// Base URL plus API path.
    api_root: Url,
    /// Bearer token.
    api_token: String,
    /// Per-attempt timeout, kept for error reporting.
    timeout: Duration,
    /// Retry policy.
    retry: RetryPolicy,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("api_root", &self.api_root.as_str())
            .field("api_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Builds a transport from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the configuration is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ClientError> {
        if config.api_token.trim().is_empty() {
            return Err(ClientError::Config("API token is required".to_string()));
        }
        if config.user_agent.trim().is_empty() {
            return Err(ClientError::Config("user agent cannot be empty".to_string()));
        }
        if config.timeout.is_zero() {
            return Err(ClientError::Config("timeout must be greater than 0".to_string()));
        }
        let api_root = build_api_root(&config.base_url, &config.api_path)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .redirect(Policy::none())
            .build()
            .map_err(|err| ClientError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            api_root,
            api_token: config.api_token,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    /// Returns the API root URL (base URL plus API path).
    #[must_use]
    pub const fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Resolves the absolute URL for a request.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, ClientError> {
        let mut url = self.api_root.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClientError::Config("api url cannot be a base".to_string()))?;
            segments.pop_if_empty();
            for segment in &request.segments {
                segments.push(segment);
            }
        }
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(key, value)| (key.as_str(), value.as_str())));
        }
        Ok(url)
    }

    /// Builds the reqwest request for one attempt.
    fn build_request(&self, request: &ApiRequest, url: &Url) -> Result<RequestBuilder, ClientError> {
        let builder = match request.method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
            Method::Put => self.client.put(url.as_str()),
            Method::Delete => self.client.delete(url.as_str()),
        }
        .bearer_auth(&self.api_token);
        match &request.body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => {
                let payload = serde_json::to_vec(value).map_err(|err| {
                    ClientError::Request(format!("failed to marshal request body: {err}"))
                })?;
                Ok(builder.header(CONTENT_TYPE, "application/json").body(payload))
            }
            RequestBody::Multipart(multipart) => {
                let mut form = Form::new();
                for (name, value) in &multipart.fields {
                    form = form.text(name.clone(), value.clone());
                }
                for file in &multipart.files {
                    let part = Part::bytes(file.content.clone())
                        .file_name(file.file_name.clone())
                        .mime_str(&file.content_type)
                        .map_err(|err| {
                            ClientError::Request(format!(
                                "invalid content type for {}: {err}",
                                file.field
                            ))
                        })?;
                    form = form.part(file.field.clone(), part);
                }
                Ok(builder.multipart(form))
            }
        }
    }

    /// Sends one attempt and waits for it while watching for cancellation.
    fn send_once(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
        url: &Url,
    ) -> Result<ApiResponse, AttemptFailure> {
        let builder = self.build_request(request, url).map_err(AttemptFailure::from)?;
        let timeout = self.timeout;
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("kosli-http".to_string())
            .spawn(move || {
                let outcome = builder
                    .send()
                    .map_err(|err| classify_send_error(&err, timeout))
                    .and_then(read_raw_response);
                let _ = sender.send(outcome);
            })
            .map_err(|err| {
                AttemptFailure::from(ClientError::Network(format!(
                    "failed to spawn request worker: {err}"
                )))
            })?;
        let raw = loop {
            match receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(outcome) => break outcome.map_err(AttemptFailure::from)?,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        return Err(AttemptFailure::from(ClientError::Cancelled));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(AttemptFailure::from(ClientError::Network(
                        "request worker exited without a response".to_string(),
                    )));
                }
            }
        };
        if (200 .. 300).contains(&raw.status) {
            return Ok(ApiResponse {
                status: raw.status,
                body: raw.body,
                request_id: raw.request_id,
            });
        }
        let error = ApiError::from_response(
            raw.status,
            &raw.body,
            raw.request_id,
            request.method.as_str(),
            url.as_str(),
        );
        Err(AttemptFailure {
            error: ClientError::Api(error),
            retry_after: raw.retry_after,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        cancel: &CancellationToken,
        request: &ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(request)?;
        let mut attempt: u32 = 0;
        loop {
            cancel.check()?;
            debug!(method = %request.method, path = %request.path(), attempt, "sending kosli api request");
            match self.send_once(cancel, request, &url) {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        path = %request.path(),
                        status = response.status,
                        "kosli api request succeeded"
                    );
                    return Ok(response);
                }
                Err(failure) => {
                    if !self.retry.should_retry(attempt, request.idempotent, &failure.error) {
                        return Err(failure.error);
                    }
                    let wait = self.retry.backoff(attempt, failure.retry_after);
                    warn!(
                        method = %request.method,
                        path = %request.path(),
                        attempt,
                        wait_ms = wait.as_millis(),
                        error = %failure.error,
                        "retrying kosli api request"
                    );
                    cancel.sleep(wait)?;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// A failed attempt plus the server's retry hint.
struct AttemptFailure {
    /// Classified failure.
    error: ClientError,
    /// Parsed `Retry-After` header, when present.
    retry_after: Option<Duration>,
}

impl From<ClientError> for AttemptFailure {
    fn from(error: ClientError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// Response data captured on the worker thread.
struct RawResponse {
    /// HTTP status code.
    status: u16,
    /// Response body.
    body: Vec<u8>,
    /// `X-Request-ID` header value.
    request_id: Option<String>,
    /// `Retry-After` header value in seconds.
    retry_after: Option<Duration>,
}

/// Builds the API root from the base URL and API path.
fn build_api_root(base_url: &str, api_path: &str) -> Result<Url, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::Config("base URL cannot be empty".to_string()));
    }
    let mut url = Url::parse(trimmed)
        .map_err(|err| ClientError::Config(format!("invalid base URL {trimmed}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!("unsupported base URL scheme: {}", url.scheme())));
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| ClientError::Config("base URL cannot be a base".to_string()))?;
        segments.pop_if_empty();
        segments.extend(api_path.split('/').filter(|segment| !segment.is_empty()));
    }
    Ok(url)
}

/// Maps a reqwest send error to a client error.
fn classify_send_error(err: &reqwest::Error, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(timeout.as_millis())
    } else {
        ClientError::Network(err.to_string())
    }
}

/// Reads status, headers and a size-limited body from a response.
fn read_raw_response(response: Response) -> Result<RawResponse, ClientError> {
    let status = response.status().as_u16();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = read_response_limited(response, MAX_RESPONSE_BYTES)?;
    Ok(RawResponse {
        status,
        body,
        request_id,
        retry_after,
    })
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: Response, max_bytes: usize) -> Result<Vec<u8>, ClientError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ClientError::Decode("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ClientError::Decode("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|err| {
        if err.to_string().contains("timed out") {
            ClientError::Network(format!("timed out reading response: {err}"))
        } else {
            ClientError::Network(format!("failed to read response: {err}"))
        }
    })?;
    if buf.len() > max_bytes {
        return Err(ClientError::Decode("response exceeds size limit".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
