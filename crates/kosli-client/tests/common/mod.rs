// crates/kosli-client/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted tiny_http server and transport builders.
// Purpose: Exercise the HTTP transport against a real local socket.
// Dependencies: kosli-client, tiny_http
// ============================================================================

//! ## Overview
//! [`serve`] starts a local server that answers a fixed script of responses
//! in order and records every request it receives, so tests can assert on
//! headers, paths and multipart bodies after the fact.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use kosli_client::HttpTransport;
use kosli_client::HttpTransportConfig;
use kosli_client::RetryPolicy;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Captured Requests
// ============================================================================

/// A request observed by the mock server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// HTTP method.
    pub method: String,
    /// Request target (path and query).
    pub url: String,
    /// Headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the body as lossy UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ============================================================================
// SECTION: Scripted Responses
// ============================================================================

/// One scripted response.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Delay before responding.
    pub delay: Option<Duration>,
}

impl ScriptedResponse {
    /// Creates a response with a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: Vec::new(),
            delay: None,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Delays the response.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

// ============================================================================
// SECTION: Mock Server
// ============================================================================

/// Running mock server.
pub struct MockServer {
    /// Base URL, e.g. `http://127.0.0.1:4242`.
    pub base_url: String,
    /// Server thread returning the captured requests.
    handle: thread::JoinHandle<Vec<CapturedRequest>>,
}

impl MockServer {
    /// Waits for the script to finish and returns the captured requests.
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().unwrap()
    }
}

/// Starts a server answering `script` in order.
///
/// The thread stops after the script is exhausted or when no request arrives
/// within two seconds.
pub fn serve(script: Vec<ScriptedResponse>) -> MockServer {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for scripted in script {
            let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(2)) else {
                break;
            };
            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);
            captured.push(CapturedRequest {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|header| (header.field.as_str().to_string(), header.value.to_string()))
                    .collect(),
                body,
            });
            if let Some(delay) = scripted.delay {
                thread::sleep(delay);
            }
            let mut response =
                Response::from_string(scripted.body).with_status_code(scripted.status);
            for (name, value) in &scripted.headers {
                response.add_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
            }
            let _ = request.respond(response);
        }
        captured
    });
    MockServer {
        base_url: format!("http://{addr}"),
        handle,
    }
}

// ============================================================================
// SECTION: Transport Builders
// ============================================================================

/// Transport configuration targeting the mock server with fast retries.
pub fn transport_config(base_url: &str) -> HttpTransportConfig {
    HttpTransportConfig {
        base_url: base_url.to_string(),
        api_path: "/api/v2".to_string(),
        user_agent: "terraform-provider-kosli/test".to_string(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(50)).unwrap(),
        ..HttpTransportConfig::new("test-token")
    }
}

/// Builds a transport targeting the mock server.
pub fn transport(base_url: &str) -> HttpTransport {
    HttpTransport::new(transport_config(base_url)).unwrap()
}
