//! # Mail Errors

use thiserror::Error;
use tillbook_core::notify::SmtpErrorCode;
use tillbook_core::CoreError;

#[derive(Debug, Error)]
pub enum MailError {
    /// The request failed validation and was never sent.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The endpoint (or the transport) reported a delivery failure.
    #[error("{code}: {message}")]
    Smtp {
        code: SmtpErrorCode,
        message: String,
    },

    /// The configured endpoint URL cannot be used.
    #[error("Invalid mail endpoint: {0}")]
    InvalidEndpoint(String),
}

impl MailError {
    pub fn smtp(code: SmtpErrorCode, message: impl Into<String>) -> Self {
        MailError::Smtp {
            code,
            message: message.into(),
        }
    }

    /// Delivery code, `None` for requests that were never sent.
    pub fn code(&self) -> Option<SmtpErrorCode> {
        match self {
            MailError::Smtp { code, .. } => Some(*code),
            MailError::InvalidEndpoint(_) => Some(SmtpErrorCode::SmtpNotConfigured),
            MailError::Invalid(_) => None,
        }
    }

    /// Text for the person who pressed "send".
    pub fn user_message(&self) -> String {
        match self {
            MailError::Invalid(e) => e.to_string(),
            other => other
                .code()
                .unwrap_or(SmtpErrorCode::SmtpError)
                .user_message()
                .to_string(),
        }
    }
}

pub type MailResult<T> = Result<T, MailError>;
