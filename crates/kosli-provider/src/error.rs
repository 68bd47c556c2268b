// crates/kosli-provider/src/error.rs
// ============================================================================
// Module: Provider Errors
// Description: Operation-scoped error taxonomy for resource handlers.
// Purpose: Render every failure with operation, resource kind and name.
// Dependencies: kosli-client, thiserror
// ============================================================================

//! ## Overview
//! Every handler failure names what was attempted (`create`, `read`, ...),
//! on which kind of resource and under which name, followed by the remote
//! message verbatim: `could not create custom attestation type "x": <message>`.
//! A 404 during a managed read is not an error; handlers turn it into
//! [`crate::ReadOutcome::Absent`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use kosli_client::ApiError;
use kosli_client::ClientError;
use thiserror::Error;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Lifecycle operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Resource creation.
    Create,
    /// Resource refresh.
    Read,
    /// In-place update.
    Update,
    /// Archival.
    Delete,
    /// Import by name.
    Import,
    /// Data source lookup.
    Lookup,
    /// Data source listing.
    List,
}

impl Operation {
    /// Returns the verb used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
            Self::Lookup => "look up",
            Self::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Custom attestation type.
    CustomAttestationType,
    /// Physical environment.
    Environment,
    /// Logical environment.
    LogicalEnvironment,
}

impl ResourceKind {
    /// Returns the human-readable kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomAttestationType => "custom attestation type",
            Self::Environment => "environment",
            Self::LogicalEnvironment => "logical environment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation, kind and name of a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Operation attempted.
    pub operation: Operation,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name; empty for list operations.
    pub name: String,
}

impl OperationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(operation: Operation, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            name: name.into(),
        }
    }

    /// Classifies a client error under this context.
    #[must_use]
    pub fn fail(&self, error: ClientError) -> ProviderError {
        match error {
            ClientError::Api(source) => ProviderError::Api {
                context: self.clone(),
                source,
            },
            other => ProviderError::Transport {
                context: self.clone(),
                source: other,
            },
        }
    }

    /// Reports a failed follow-up read after a successful write.
    #[must_use]
    pub fn inconsistent(&self, error: ClientError) -> ProviderError {
        ProviderError::InconsistentState {
            context: self.clone(),
            source: error,
        }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{} {}s", self.operation, self.kind)
        } else {
            write!(f, "{} {} \"{}\"", self.operation, self.kind, self.name)
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resource handler errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Validation` and `RequiresReplacement` are raised before any network call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Desired state is malformed.
    #[error("invalid {kind} \"{name}\": {message}")]
    Validation {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name as supplied.
        name: String,
        /// What is wrong.
        message: String,
    },
    /// An immutable attribute changed; the resource must be recreated.
    #[error("{kind} \"{name}\" requires replacement: {attribute} cannot change from \"{from}\" to \"{to}\"")]
    RequiresReplacement {
        /// Resource kind.
        kind: ResourceKind,
        /// Current resource name.
        name: String,
        /// Immutable attribute that changed.
        attribute: &'static str,
        /// Current value.
        from: String,
        /// Desired value.
        to: String,
    },
    /// The API answered with a non-2xx status.
    #[error("could not {context}: {}", .source.message)]
    Api {
        /// Failed operation.
        context: OperationContext,
        /// API error with status and request id.
        source: ApiError,
    },
    /// The request never produced an API answer (network, timeout, cancel, decode).
    #[error("could not {context}: {source}")]
    Transport {
        /// Failed operation.
        context: OperationContext,
        /// Underlying client failure.
        source: ClientError,
    },
    /// The write succeeded but its follow-up read failed.
    #[error(
        "could not confirm {context}: the write was accepted but the follow-up read failed, so it may exist remotely without being tracked: {source}"
    )]
    InconsistentState {
        /// Write operation whose result could not be confirmed.
        context: OperationContext,
        /// Follow-up read failure.
        source: ClientError,
    },
    /// Provider configuration is unusable.
    #[error("provider configuration error: {0}")]
    Configuration(String),
    /// The remote object is of a different kind than expected.
    #[error("{kind} \"{name}\" has type \"{actual}\", expected \"{expected}\"")]
    UnexpectedType {
        /// Expected resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
        /// Expected type token.
        expected: String,
        /// Type token returned by the API.
        actual: String,
    },
}

impl ProviderError {
    /// Returns the API error when the remote answered non-2xx.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true when the caller cancelled the operation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        match self {
            Self::Transport { source, .. } | Self::InconsistentState { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }

    /// Returns true when the resource must be replaced rather than updated.
    #[must_use]
    pub const fn requires_replacement(&self) -> bool {
        matches!(self, Self::RequiresReplacement { .. })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
