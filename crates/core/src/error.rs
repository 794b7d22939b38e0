use thiserror::Error;

/// Raised when a stored or submitted string is not a member of a closed set
/// such as roles, categories, or statuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Trims a required text field, rejecting blank input.
pub(crate) fn required_text(raw: impl Into<String>) -> Option<String> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Trims an optional text field; blank becomes `None`.
pub(crate) fn optional_text(raw: Option<String>) -> Option<String> {
    raw.and_then(required_text)
}
