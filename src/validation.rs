//! Request validation utilities.

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> crate::types::Result<()> {
    if s.trim().is_empty() {
        return Err(crate::types::Error::validation(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

/// Validate that a physical magnitude is strictly positive.
pub fn validate_positive(value: f64, field: &str) -> crate::types::Result<()> {
    if !(value > 0.0) {
        return Err(crate::types::Error::computation(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}
