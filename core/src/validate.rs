//! Argument checks shared by the resource facades.
//!
//! Every check fails with `Error::Precondition` and runs before any request
//! is built.

use crate::error::{Error, Result};

/// Require a string that is non-empty after trimming.
pub(crate) fn require_text<'a>(value: &'a str, name: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::Precondition(format!("{name} is required")));
    }
    Ok(value)
}

/// Like [`require_text`] for optional fields of a request value.
pub(crate) fn require_opt_text<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    require_text(value.unwrap_or_default(), name)
}

/// Require an identifier to be present.
pub(crate) fn require_id<T: Copy>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::Precondition(format!("{name} is required")))
}
