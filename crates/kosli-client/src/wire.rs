// crates/kosli-client/src/wire.rs
// ============================================================================
// Module: Kosli Wire Primitives
// Description: Shared serde helpers and timestamp type for API payloads.
// Purpose: Decode tolerant API responses without conflating null and zero.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The Kosli API reports timestamps as floating-point unix seconds and sends
//! `null` for collections it has not populated. [`UnixTimestamp`] keeps the raw
//! float for lossless round trips, and [`null_as_default`] folds `null` into
//! the empty value for collection fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// A wire timestamp in unix seconds.
///
/// # Invariants
/// - Absence is modelled as `Option<UnixTimestamp>::None`, never as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(pub f64);

impl UnixTimestamp {
    /// Returns the raw seconds value.
    #[must_use]
    pub const fn seconds(self) -> f64 {
        self.0
    }

    /// Converts to a UTC date-time; `None` when out of range or not finite.
    #[must_use]
    pub fn to_offset_date_time(self) -> Option<OffsetDateTime> {
        let offset = time::Duration::checked_seconds_f64(self.0)?;
        OffsetDateTime::UNIX_EPOCH.checked_add(offset)
    }

    /// Formats the timestamp as RFC 3339.
    #[must_use]
    pub fn to_rfc3339(self) -> Option<String> {
        self.to_offset_date_time().and_then(|value| value.format(&Rfc3339).ok())
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}", self.0),
        }
    }
}

// ============================================================================
// SECTION: Serde Helpers
// ============================================================================

/// Deserializes `null` as the type's default value.
///
/// # Errors
///
/// Returns the deserializer's error when the value is neither `null` nor a
/// valid `T`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
