// crates/kosli-provider/src/lifecycle.rs
// ============================================================================
// Module: Resource Lifecycle
// Description: Lifecycle trait, read outcomes, plans and the apply driver.
// Purpose: Give every managed resource the same create/read/update/delete seam.
// Dependencies: kosli-client, tracing
// ============================================================================

//! ## Overview
//! A [`Resource`] maps one remote object kind onto the create, read, update,
//! delete and import operations of an orchestrating engine. [`Resource::plan`]
//! is pure: it validates the desired state and compares it with prior state
//! without touching the network. [`apply`] executes a plan the way an engine
//! would, which keeps the end-to-end behaviour testable without one.
//!
//! Invariants:
//! - Writes are always followed by a read; handlers never trust write bodies.
//! - A missing or archived object reads as [`ReadOutcome::Absent`], not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use kosli_client::CancellationToken;
use tracing::info;

use crate::error::ProviderError;

// ============================================================================
// SECTION: Outcomes and Plans
// ============================================================================

/// Result of a managed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    /// The object exists; carries the reconciled state.
    Present(T),
    /// The object is gone (404 or archived) and should be dropped from state.
    Absent,
}

impl<T> ReadOutcome<T> {
    /// Returns the state when present.
    #[must_use]
    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(state) => Some(state),
            Self::Absent => None,
        }
    }

    /// Returns true when the object is gone.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Planned action for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePlan {
    /// No prior state; the object will be created.
    Create,
    /// Desired state matches prior state.
    NoChange,
    /// Mutable attributes differ; the object is updated in place.
    Update {
        /// Changed attribute names.
        attributes: Vec<&'static str>,
    },
    /// Immutable attributes differ; the object is archived and recreated.
    Replace {
        /// Changed immutable attribute names.
        attributes: Vec<&'static str>,
    },
}

impl ResourcePlan {
    /// Builds a plan from changed mutable attributes.
    #[must_use]
    pub fn from_changes(attributes: Vec<&'static str>) -> Self {
        if attributes.is_empty() { Self::NoChange } else { Self::Update { attributes } }
    }

    /// Returns true when applying the plan performs no remote call.
    #[must_use]
    pub const fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}

// ============================================================================
// SECTION: Resource Trait
// ============================================================================

/// A managed remote object.
pub trait Resource {
    /// User-supplied desired state.
    type Config;
    /// Tracked state after reconciliation.
    type State: Clone;

    /// Resource type name as exposed to configuration authors.
    const TYPE_NAME: &'static str;

    /// Validates `desired` and compares it with `prior`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Validation`] for malformed desired state.
    fn plan(
        &self,
        prior: Option<&Self::State>,
        desired: &Self::Config,
    ) -> Result<ResourcePlan, ProviderError>;

    /// Creates the object, then reads it back.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`]; a failed follow-up read is
    /// [`ProviderError::InconsistentState`].
    fn create(
        &self,
        cancel: &CancellationToken,
        desired: &Self::Config,
    ) -> Result<Self::State, ProviderError>;

    /// Refreshes tracked state from the remote object.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] for failures other than absence.
    fn read(
        &self,
        cancel: &CancellationToken,
        prior: &Self::State,
    ) -> Result<ReadOutcome<Self::State>, ProviderError>;

    /// Updates the object in place, then reads it back.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::RequiresReplacement`] before any network call
    /// when an immutable attribute changed.
    fn update(
        &self,
        cancel: &CancellationToken,
        prior: &Self::State,
        desired: &Self::Config,
    ) -> Result<Self::State, ProviderError>;

    /// Archives the object; an already missing object counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] for failures other than 404.
    fn delete(&self, cancel: &CancellationToken, prior: &Self::State) -> Result<(), ProviderError>;

    /// Reads an existing object into fresh state.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] for failures other than absence.
    fn import(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<ReadOutcome<Self::State>, ProviderError>;
}

// ============================================================================
// SECTION: Apply Driver
// ============================================================================

/// Converges one resource from `prior` to `desired`.
///
/// `desired == None` destroys the object. Replacement archives the old object
/// before creating the new one. Returns the state to track afterwards.
///
/// # Errors
///
/// Returns the first [`ProviderError`] raised by planning or a handler.
pub fn apply<R: Resource>(
    resource: &R,
    cancel: &CancellationToken,
    prior: Option<&R::State>,
    desired: Option<&R::Config>,
) -> Result<Option<R::State>, ProviderError> {
    let Some(desired) = desired else {
        if let Some(prior) = prior {
            info!(resource = R::TYPE_NAME, "destroying resource");
            resource.delete(cancel, prior)?;
        }
        return Ok(None);
    };
    match (resource.plan(prior, desired)?, prior) {
        (ResourcePlan::NoChange, prior) => Ok(prior.cloned()),
        (ResourcePlan::Create, _) | (ResourcePlan::Update { .. }, None) => {
            info!(resource = R::TYPE_NAME, "creating resource");
            resource.create(cancel, desired).map(Some)
        }
        (ResourcePlan::Update { attributes }, Some(prior)) => {
            info!(resource = R::TYPE_NAME, changed = ?attributes, "updating resource");
            resource.update(cancel, prior, desired).map(Some)
        }
        (ResourcePlan::Replace { attributes }, prior) => {
            info!(resource = R::TYPE_NAME, changed = ?attributes, "replacing resource");
            if let Some(prior) = prior {
                resource.delete(cancel, prior)?;
            }
            resource.create(cancel, desired).map(Some)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps empty text to `None` so unset and empty compare equal.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(ToString::to_string)
}

/// Records `attribute` when `changed` holds.
pub(crate) fn note_change(changes: &mut Vec<&'static str>, attribute: &'static str, changed: bool) {
    if changed {
        changes.push(attribute);
    }
}
