//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Dates are serialised as `YYYY-MM-DD` and times of day as `HH:MM`.
//!
//! Update types only carry the fields a caller is allowed to change. Any other keys in the
//! request body are ignored during deserialisation.

use crate::error::{Error, Result};

pub mod admin;
pub mod auth;
pub mod candidate;
pub mod election;
pub mod id;
pub mod organization;
pub mod polling;
pub mod upload;
pub mod voter;

/// Reject blank values for required text fields.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}

/// Minimal sanity check on email addresses; delivery is the real test.
pub(crate) fn require_email(value: &str) -> Result<()> {
    require("email", value)?;
    match value.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::Validation(format!("`{value}` is not an email address"))),
    }
}

/// Overwrite `target` with `value` if one was given, rejecting blank values.
pub(crate) fn set_text(field: &str, target: &mut String, value: Option<String>) -> Result<()> {
    if let Some(value) = value {
        require(field, &value)?;
        *target = value;
    }
    Ok(())
}
