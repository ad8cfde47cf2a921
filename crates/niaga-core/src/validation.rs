//! # Validation Module
//!
//! Input validation for records before they reach totals or storage.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: CLI argument parsing (clap)                                   │
//! │  └── Types and required flags                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Lengths, formats (product code, NPWP)                              │
//! │  └── Quantity, price and deduction ranges                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use niaga_core::validation::{validate_product_code, validate_quantity};
//!
//! validate_product_code("BRG-001").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a consumer (customer) name: required, at most 200 characters.
pub fn validate_consumer_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("product name", name, 200)
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumerics, hyphens, underscores and dots
///
/// ```rust
/// use niaga_core::validation::validate_product_code;
///
/// assert!(validate_product_code("BRG-001").is_ok());
/// assert!(validate_product_code("BRG 001").is_err());
/// assert!(validate_product_code("").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    validate_text("code", code, 50)?;
    let valid = code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "only letters, digits, '-', '_' and '.' are allowed".to_string(),
        });
    }
    Ok(())
}

/// Validates an NPWP (taxpayer number).
///
/// Dots and hyphens are formatting only; what remains must be 15 digits
/// (legacy) or 16 digits (NIK-based).
///
/// ```rust
/// use niaga_core::validation::validate_npwp;
///
/// assert!(validate_npwp("01.234.567.8-901.000").is_ok());
/// assert!(validate_npwp("3201234567890001").is_ok());
/// assert!(validate_npwp("12.345").is_err());
/// ```
pub fn validate_npwp(npwp: &str) -> ValidationResult<()> {
    let digits: String = npwp
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != '-')
        .collect();
    if digits.is_empty() {
        return Err(ValidationError::required("npwp"));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) || !(digits.len() == 15 || digits.len() == 16) {
        return Err(ValidationError::InvalidFormat {
            field: "npwp".to_string(),
            reason: "expected 15 or 16 digits".to_string(),
        });
    }
    Ok(())
}

/// Validates a free-form document number (SO number, imported invoice
/// number, tax invoice number): required, at most 64 characters.
pub fn validate_document_number(field: &str, number: &str) -> ValidationResult<()> {
    validate_text(field, number, 64)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: `1..=MAX_ITEM_QUANTITY`.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a unit price. Free items (price 0) are allowed.
pub fn validate_price(price: i64) -> ValidationResult<()> {
    if price < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a down payment or settlement amount.
pub fn validate_deduction(field: &str, amount: i64) -> ValidationResult<()> {
    if amount < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the number of lines on a document.
pub fn validate_line_count(len: usize) -> CoreResult<()> {
    if len == 0 {
        return Err(CoreError::EmptyDocument);
    }
    if len > MAX_LINE_ITEMS {
        return Err(CoreError::TooManyLines {
            max: MAX_LINE_ITEMS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert!(validate_consumer_name("PT Sinar Abadi").is_ok());
        assert!(validate_consumer_name("   ").is_err());
        assert!(validate_consumer_name(&"x".repeat(201)).is_err());
        assert!(validate_product_name("Kertas A4").is_ok());
    }

    #[test]
    fn test_product_code() {
        assert!(validate_product_code("A4.80GSM_01").is_ok());
        assert!(matches!(
            validate_product_code("A4/80"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_product_code(&"A".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
    }

    #[test]
    fn test_npwp() {
        assert!(validate_npwp("012345678901000").is_ok());
        assert!(validate_npwp("01.234.567.8-901.000").is_ok());
        assert!(validate_npwp("01234567890100A").is_err());
        assert!(validate_npwp("01234567890").is_err());
        assert!(matches!(validate_npwp(""), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-2).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_amounts() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(-1).is_err());
        assert!(validate_deduction("dp", 0).is_ok());
        let err = validate_deduction("pelunasan", -10).unwrap_err();
        assert_eq!(err.to_string(), "pelunasan must not be negative");
    }

    #[test]
    fn test_line_count() {
        assert!(matches!(validate_line_count(0), Err(CoreError::EmptyDocument)));
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS).is_ok());
        assert!(matches!(
            validate_line_count(MAX_LINE_ITEMS + 1),
            Err(CoreError::TooManyLines { .. })
        ));
    }

    #[test]
    fn test_document_number() {
        assert!(validate_document_number("so number", "SO-2026-001").is_ok());
        assert!(validate_document_number("so number", "").is_err());
    }
}
