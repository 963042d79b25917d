//! # Application Error Type
//!
//! Every lower error becomes a machine code plus a message fit for the person
//! at the register.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError ─┐                                                           │
//! │  DbError ───┤                                                           │
//! │  MailError ─┼──► AppError { code, message } ──► stderr "[CODE] message" │
//! │  Template ──┤                                   exit status 1           │
//! │  Config ────┘                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::Serialize;
use tracing::error;

use tillbook_core::{CoreError, TemplateError};
use tillbook_db::DbError;
use tillbook_mail::MailError;

use crate::config::ConfigError;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    ValidationError,
    InvalidTransition,
    MissingTenant,
    TemplateError,
    DatabaseError,
    MailError,
    ConfigError,
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::MissingTenant => "MISSING_TENANT",
            ErrorCode::TemplateError => "TEMPLATE_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::MailError => "MAIL_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::IoError => "IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingTenant => AppError::new(
                ErrorCode::MissingTenant,
                "No organization selected. Set [organization] id or TILLBOOK_ORG_ID.",
            ),
            e @ (CoreError::InvalidTransition { .. } | CoreError::NotEditable { .. }) => {
                AppError::new(ErrorCode::InvalidTransition, e.to_string())
            }
            CoreError::ItemNotFound(id) => {
                AppError::new(ErrorCode::NotFound, format!("Line item not found: {}", id))
            }
            e @ (CoreError::InvalidInput { .. } | CoreError::Validation(_)) => {
                AppError::validation(e.to_string())
            }
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(e) => e.into(),
            e @ DbError::NotFound { .. } => AppError::new(ErrorCode::NotFound, e.to_string()),
            e @ DbError::AlreadyExists { .. } => AppError::new(ErrorCode::AlreadyExists, e.to_string()),
            DbError::Serialization(e) => {
                error!("Stored document is unreadable: {}", e);
                AppError::new(ErrorCode::DatabaseError, "A stored document could not be read")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                AppError::new(ErrorCode::DatabaseError, "The change was not saved. Nothing was modified.")
            }
            other => {
                error!("Database error: {}", other);
                AppError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Invalid(e) => e.into(),
            other => AppError::new(ErrorCode::MailError, other.user_message()),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::new(ErrorCode::TemplateError, format!("Template is broken: {}", err))
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::new(ErrorCode::IoError, err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::validation(format!("Invalid document JSON: {}", err))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;
