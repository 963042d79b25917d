//! # Error Types
//!
//! Domain-specific error types for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Field-level input failures                     │
//! │  └── TemplateError    - Malformed document templates                   │
//! │                                                                         │
//! │  tillbook-db errors (separate crate)                                   │
//! │  └── DbError          - Storage and transaction failures               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → AppError → User         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `TemplateError` deliberately does NOT convert into `CoreError`: a broken
//! template fails the render call that used it, nothing else.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A numeric input is outside the allowed domain.
    ///
    /// ## When This Occurs
    /// - Line quantity below 1
    /// - Negative unit price
    /// - Negative payment amount
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// A status change that the document's state machine does not allow.
    ///
    /// ## When This Occurs
    /// - Converting a quote that was already converted
    /// - Moving a paid invoice back to draft
    /// - Seating an order at a table under maintenance
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// A document was mutated while in a non-editable status.
    #[error("{entity} is {status} and can no longer be edited")]
    NotEditable {
        entity: &'static str,
        status: &'static str,
    },

    /// Operation attempted without an active organization.
    ///
    /// Rejected before any write happens.
    #[error("No active organization selected")]
    MissingTenant,

    /// Line item id is not part of the document.
    #[error("Line item not found: {0}")]
    ItemNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidInput error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Reported inline at the edge of a form submission, never persisted.
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

    /// Invalid format (e.g., invalid email, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Template Error
// =============================================================================

/// Template syntax errors.
///
/// Every variant carries the byte offset of the offending tag so that
/// template editors can point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// `{{` without a matching `}}`.
    #[error("Unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },

    /// `{{}}`, `{{#}}` or `{{/}}`.
    #[error("Empty tag at byte {offset}")]
    EmptyTag { offset: usize },

    /// Tag name containing braces.
    #[error("Invalid tag '{tag}' at byte {offset}")]
    InvalidTag { tag: String, offset: usize },

    /// `{{#each}}` without a list key.
    #[error("Missing list name in each block at byte {offset}")]
    MissingListKey { offset: usize },

    /// `{{/name}}` with no open block.
    #[error("Closing tag '{name}' at byte {offset} has no matching open block")]
    UnmatchedClose { name: String, offset: usize },

    /// `{{/name}}` closing a block opened under another name.
    #[error("Closing tag '{found}' at byte {offset} does not match open block '{expected}'")]
    MismatchedClose {
        expected: String,
        found: String,
        offset: usize,
    },

    /// Block opened but never closed.
    #[error("Block '{name}' opened at byte {offset} is never closed")]
    UnclosedBlock { name: String, offset: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
