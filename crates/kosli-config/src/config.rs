// crates/kosli-config/src/config.rs
// ============================================================================
// Module: Kosli Provider Configuration
// Description: Configuration loading, env fallbacks and validation.
// Purpose: Resolve the token/org/endpoint triple once and build the client.
// Dependencies: kosli-client, serde, toml, tracing, url
// ============================================================================

//! ## Overview
//! Provider configuration is read from an optional TOML file, then completed
//! from the `KOSLI_API_TOKEN`, `KOSLI_ORG` and `KOSLI_API_URL` environment
//! variables for any field the file leaves unset. File values always win.
//! Validation fails closed: a configuration that passes [`ProviderConfig::validate`]
//! always builds a working [`KosliClient`].
//!
//! Security posture: the API token is never logged and `Debug` output redacts it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kosli_client::HttpTransport;
use kosli_client::HttpTransportConfig;
use kosli_client::KosliClient;
use kosli_client::RetryPolicy;
use kosli_client::http::DEFAULT_API_PATH;
use kosli_client::http::DEFAULT_BASE_URL;
use kosli_client::http::US_BASE_URL;
use kosli_client::retry::DEFAULT_RETRY_MAX;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "kosli.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "KOSLI_CONFIG";
/// Environment variable supplying the API token.
pub const API_TOKEN_ENV_VAR: &str = "KOSLI_API_TOKEN";
/// Environment variable supplying the organization.
pub const ORG_ENV_VAR: &str = "KOSLI_ORG";
/// Environment variable supplying the API base URL.
pub const API_URL_ENV_VAR: &str = "KOSLI_API_URL";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Maximum per-request timeout in seconds.
const MAX_TIMEOUT_SECS: u64 = 600;
/// Maximum number of retries.
const MAX_RETRIES: u32 = 10;
/// Default minimum backoff in milliseconds.
const DEFAULT_WAIT_MIN_MS: u64 = 1_000;
/// Default maximum backoff in milliseconds.
const DEFAULT_WAIT_MAX_MS: u64 = 30_000;
/// User agent product token.
const USER_AGENT_PRODUCT: &str = "terraform-provider-kosli";

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Kosli API region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Europe, `https://app.kosli.com`.
    #[default]
    Eu,
    /// United States, `https://app.us.kosli.com`.
    Us,
}

impl Region {
    /// Returns the region's API base URL.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Eu => DEFAULT_BASE_URL,
            Self::Us => US_BASE_URL,
        }
    }
}

/// Retry settings.
///
/// # Invariants
/// - `0 < wait_min_ms <= wait_max_ms` after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    #[serde(default = "default_wait_min_ms")]
    pub wait_min_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_wait_max_ms")]
    pub wait_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            wait_min_ms: default_wait_min_ms(),
            wait_max_ms: default_wait_max_ms(),
        }
    }
}

impl RetryConfig {
    /// Validates retry bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "retry.max_retries must be at most {MAX_RETRIES}"
            )));
        }
        if self.wait_min_ms == 0 || self.wait_max_ms == 0 {
            return Err(ConfigError::Invalid("retry waits must be greater than zero".to_string()));
        }
        if self.wait_min_ms > self.wait_max_ms {
            return Err(ConfigError::Invalid(
                "retry.wait_min_ms must be <= retry.wait_max_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts to the client's retry policy.
    fn policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.wait_min_ms),
            Duration::from_millis(self.wait_max_ms),
        )
        .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Provider configuration.
///
/// # Invariants
/// - After [`ProviderConfig::validate`], `api_token` and `org` are set and
///   non-empty, and the resolved base URL is an absolute `http(s)` URL.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API token; falls back to `KOSLI_API_TOKEN`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Organization; falls back to `KOSLI_ORG`.
    #[serde(default)]
    pub org: Option<String>,
    /// API base URL; falls back to `KOSLI_API_URL`, then to the region.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Region used when no base URL is configured.
    #[serde(default)]
    pub region: Region,
    /// API path appended to the base URL.
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            org: None,
            api_url: None,
            region: Region::default(),
            api_path: default_api_path(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("org", &self.org)
            .field("api_url", &self.api_url)
            .field("region", &self.region)
            .field("api_path", &self.api_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ProviderConfig {
    /// Loads configuration from disk, applies env fallbacks and validates.
    ///
    /// An explicit path or `KOSLI_CONFIG` must point at an existing file. When
    /// neither is set and `kosli.toml` does not exist, configuration comes from
    /// the environment alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, parsing or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration file without env fallbacks or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        debug!(path = %path.display(), "loaded kosli config file");
        Self::from_toml_str(content)
    }

    /// Parses TOML configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown fields.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Fills unset or empty fields from environment lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill_from(&mut self.api_token, &lookup, API_TOKEN_ENV_VAR);
        fill_from(&mut self.org, &lookup, ORG_ENV_VAR);
        fill_from(&mut self.api_url, &lookup, API_URL_ENV_VAR);
    }

    /// Returns the effective base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.region.base_url())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is incomplete or
    /// out of bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.as_deref().is_none_or(|value| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "api_token is required (set it in the config file or {API_TOKEN_ENV_VAR})"
            )));
        }
        if self.org.as_deref().is_none_or(|value| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "org is required (set it in the config file or {ORG_ENV_VAR})"
            )));
        }
        let base_url = self.base_url();
        let parsed = Url::parse(base_url)
            .map_err(|err| ConfigError::Invalid(format!("invalid api_url {base_url}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api_url must use http or https: {base_url}"
            )));
        }
        if !self.api_path.is_empty() && !self.api_path.starts_with('/') {
            return Err(ConfigError::Invalid("api_path must start with '/'".to_string()));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        self.retry.validate()
    }

    /// Returns the transport configuration for a provider version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid.
    pub fn transport_config(&self, provider_version: &str) -> Result<HttpTransportConfig, ConfigError> {
        self.validate()?;
        let version = if provider_version.trim().is_empty() { "dev" } else { provider_version };
        Ok(HttpTransportConfig {
            base_url: self.base_url().to_string(),
            api_path: self.api_path.clone(),
            user_agent: format!("{USER_AGENT_PRODUCT}/{version}"),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: self.retry.policy()?,
            ..HttpTransportConfig::new(self.api_token.clone().unwrap_or_default())
        })
    }

    /// Builds the organization-scoped API client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid or the HTTP
    /// client cannot be constructed.
    pub fn build_client(&self, provider_version: &str) -> Result<KosliClient, ConfigError> {
        let transport = HttpTransport::new(self.transport_config(provider_version)?)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        KosliClient::new(Arc::new(transport), self.org.clone().unwrap_or_default())
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default API path.
fn default_api_path() -> String {
    DEFAULT_API_PATH.to_string()
}

/// Default timeout in seconds.
const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Default retry count.
const fn default_max_retries() -> u32 {
    DEFAULT_RETRY_MAX
}

/// Default minimum backoff.
const fn default_wait_min_ms() -> u64 {
    DEFAULT_WAIT_MIN_MS
}

/// Default maximum backoff.
const fn default_wait_max_ms() -> u64 {
    DEFAULT_WAIT_MAX_MS
}

/// Sets `slot` from `lookup(var)` when it is unset or blank.
fn fill_from<F>(slot: &mut Option<String>, lookup: &F, var: &str)
where
    F: Fn(&str) -> Option<String>,
{
    if slot.as_deref().is_some_and(|value| !value.trim().is_empty()) {
        return;
    }
    if let Some(value) = lookup(var).filter(|value| !value.trim().is_empty()) {
        *slot = Some(value);
    }
}

/// Resolves the config path; `None` means env-only configuration.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
