//! Calculator error types.
//!
//! Aggregating an empty collection is not an error: it yields an empty map
//! or a zeroed result.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfitError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl ProfitError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ProfitError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for calculator operations.
pub type ProfitResult<T> = Result<T, ProfitError>;

/// Reject NaN, infinite and negative amounts.
pub fn check_amount(field: &str, value: f64) -> ProfitResult<()> {
    if !value.is_finite() {
        return Err(ProfitError::invalid(field, format!("{} is not a number", value)));
    }
    if value < 0.0 {
        return Err(ProfitError::invalid(
            field,
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_zero_and_positive() {
        assert!(check_amount("labor", 0.0).is_ok());
        assert!(check_amount("labor", 1250.5).is_ok());
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(matches!(
            check_amount("labor", -1.0),
            Err(ProfitError::InvalidInput { ref field, .. }) if field == "labor"
        ));
        assert!(check_amount("material", f64::NAN).is_err());
        assert!(check_amount("equipment", f64::INFINITY).is_err());
    }

    #[test]
    fn message_names_the_field() {
        let err = check_amount("subcontractor", -5.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input for subcontractor: must be non-negative, got -5"
        );
    }
}
