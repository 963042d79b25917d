//! # Validation Module
//!
//! Field-level checks run at the edge of a form submission.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  form / CLI input                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE ──► ValidationError (reported inline, never persisted)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  domain types (LineItem::new, Payment::new) ──► CoreError::Validation   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tillbook-db                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values; returns the trimmed value.
pub fn validate_required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value)
}

/// Validates an item, customer or template name.
///
/// ```rust
/// use tillbook_core::validation::validate_name;
///
/// assert!(validate_name("Flat white").is_ok());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = validate_required("name", name)?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// Shape check only: one `@`, a non-empty local part, and a domain with an
/// inner dot.
///
/// ```rust
/// use tillbook_core::validation::validate_email;
///
/// assert!(validate_email("billing@acme.io").is_ok());
/// assert!(validate_email("acme.io").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = validate_required("email", email)?;

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must contain exactly one @ after a name"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain is not valid"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - At least 1
/// - At most `MAX_ITEM_QUANTITY` (catches typing 1000 instead of 10)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Prices may be zero (free items), never negative, at most `MAX_UNIT_PRICE`.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE.cents(),
        });
    }
    Ok(())
}

/// A recorded payment must move money.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// Tax rate in basis points, 0% to 100%.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_trims() {
        assert_eq!(validate_required("subject", "  Invoice  ").unwrap(), "Invoice");
        assert!(matches!(
            validate_required("subject", "   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Flat white").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("billing@acme.io").is_ok());
        assert!(validate_email("first.last+inv@mail.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("acme.io").is_err());
        assert!(validate_email("@acme.io").is_err());
        assert!(validate_email("a@b@acme.io").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_email("a@acme.").is_err());
        assert!(validate_email("a b@acme.io").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
        assert!(validate_price(MAX_UNIT_PRICE).is_ok());
        assert!(validate_price(MAX_UNIT_PRICE + Money::from_cents(1)).is_err());
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }
}
