//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use uuid::Uuid;

use crate::{EngineError, Quantity, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Invalid(format!("invalid {label} id")))
}

/// Validate a required single-line text field and return it trimmed.
///
/// Rejects empty/blank values and values containing control characters.
pub(crate) fn normalize_text_line(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Invalid(format!("{label} is empty")));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(EngineError::Invalid(format!("{label} is not a text line")));
    }
    Ok(trimmed.to_string())
}

/// Like [`normalize_text_line`], but blank input means "absent".
pub(crate) fn normalize_optional_text_line(
    value: Option<&str>,
    label: &str,
) -> ResultEngine<Option<String>> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => normalize_text_line(value, label).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn ensure_positive(quantity: Quantity, label: &str) -> ResultEngine<()> {
    if !quantity.is_positive() {
        return Err(EngineError::Invalid(format!("{label} must be > 0")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lines_are_trimmed() {
        assert_eq!(normalize_text_line("  Acme  ", "name").unwrap(), "Acme");
    }

    #[test]
    fn text_lines_reject_blank_and_control_chars() {
        assert_eq!(
            normalize_text_line("   ", "code"),
            Err(EngineError::Invalid("code is empty".to_string()))
        );
        assert_eq!(
            normalize_text_line("a\nb", "code"),
            Err(EngineError::Invalid("code is not a text line".to_string()))
        );
    }

    #[test]
    fn blank_optional_text_is_none() {
        assert_eq!(normalize_optional_text_line(Some("  "), "d").unwrap(), None);
        assert_eq!(normalize_optional_text_line(None, "d").unwrap(), None);
    }
}
