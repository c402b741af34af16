use std::sync::OnceLock;

use regex::Regex;

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-.:@]{0,127}$").ok())
        .as_ref()
}

/// Checks an externally supplied identifier (patient, doctor, reserve, order).
pub fn validate_identifier(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    if !identifier_pattern().is_some_and(|pattern| pattern.is_match(value)) {
        return Err(format!("{} has an invalid format", field));
    }
    Ok(())
}

/// Normalises an optional free-text field: trims and drops empty strings.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
