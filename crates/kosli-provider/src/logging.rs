// crates/kosli-provider/src/logging.rs
// ============================================================================
// Module: Logging
// Description: Process-wide tracing subscriber setup.
// Purpose: Route structured provider logs to stderr under an env filter.
// Dependencies: thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! Logs go to stderr; stdout is reserved for the plugin protocol of the
//! orchestrating engine. The filter comes from `KOSLI_LOG` using
//! `tracing-subscriber` directive syntax and defaults to `info`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "KOSLI_LOG";
/// Filter used when [`LOG_ENV_VAR`] is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directives do not parse.
    #[error("invalid log filter \"{directives}\": {message}")]
    InvalidFilter {
        /// Directives as supplied.
        directives: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the filter from optional directives, defaulting to `info`.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] when the directives do not parse.
pub fn log_filter(directives: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directives =
        directives.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directives).map_err(|err| LoggingError::InvalidFilter {
        directives: directives.to_string(),
        message: err.to_string(),
    })
}

/// Installs the global stderr subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already installed; callers that may initialize twice can ignore the
/// latter.
pub fn init_logging() -> Result<(), LoggingError> {
    let filter = log_filter(env::var(LOG_ENV_VAR).ok().as_deref())?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .try_init()
        .map_err(|err| LoggingError::AlreadyInitialized(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
