use serde::Serialize;
use thiserror::Error as ThisError;

/// A boundary-level constraint violation, always naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ThisError)]
#[error("invalid `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Checks a character-count range (not bytes) on a required text field.
pub(crate) fn check_char_len(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(
            field,
            format!("must have at least {min} character(s), got {len}"),
        ));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("must have at most {max} characters, got {len}"),
        ));
    }
    Ok(())
}

pub(crate) fn require_non_blank(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        Some(_) => Err(ValidationError::new(field, "must not be blank")),
        None => Err(ValidationError::new(field, "is required")),
    }
}

pub(crate) fn require_absent(
    field: &str,
    value: Option<&str>,
    reason: &str,
) -> Result<(), ValidationError> {
    match value {
        None => Ok(()),
        Some(_) => Err(ValidationError::new(field, format!("must be null {reason}"))),
    }
}
