//! # Error Types
//!
//! Domain-specific error types for niaga-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  niaga-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  niaga-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → anyhow (CLI)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invoice or order has no lines to total.
    #[error("Document has no line items")]
    EmptyDocument,

    /// Too many lines on one document.
    #[error("Document cannot have more than {max} line items")]
    TooManyLines { max: usize },

    /// Deductions (DP + pelunasan) exceed the negotiated value.
    ///
    /// ## When This Occurs
    /// ```text
    /// subtotal 200.000 + negotiation 0
    ///      │
    ///      ▼
    /// dp 150.000 + pelunasan 100.000 = 250.000
    ///      │
    ///      ▼
    /// NegativeGoodsValue { goods: -50000 }
    /// ```
    #[error("Deductions exceed invoice value: goods would be {goods}")]
    NegativeGoodsValue { goods: i64 },

    /// A ratio with a zero or negative denominator.
    #[error("Invalid ratio {num}/{den}")]
    InvalidRatio { num: i64, den: i64 },

    /// Arithmetic left the i64 range.
    #[error("Amount overflow while computing {context}")]
    Overflow { context: String },

    /// The sequence space for a scheme/year is used up.
    #[error("Sequence exhausted for {scheme} in {year}")]
    SequenceExhausted { scheme: String, year: i32 },

    /// Year outside the four-digit range numbers can encode.
    #[error("Year {0} cannot be encoded in a document number")]
    InvalidYear(i32),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., NPWP digits, product code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::NegativeGoodsValue { goods: -50_000 };
        assert_eq!(
            err.to_string(),
            "Deductions exceed invoice value: goods would be -50000"
        );

        let err = CoreError::SequenceExhausted {
            scheme: "SAR".to_string(),
            year: 2026,
        };
        assert_eq!(err.to_string(), "Sequence exhausted for SAR in 2026");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("name");
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustNotBeNegative {
            field: "dp".to_string(),
        };
        assert_eq!(err.to_string(), "dp must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("number").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
