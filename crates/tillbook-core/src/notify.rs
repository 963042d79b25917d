//! # Outbound Email Contract
//!
//! Request body and error taxonomy of the invoice email endpoint. The HTTP
//! client lives in `tillbook-mail`; this module is the shared vocabulary.
//!
//! ## Wire Format
//! ```text
//! POST {endpoint}
//! { "invoiceId": "...", "recipientEmail": "...", "subject": "...",
//!   "message": "...", "organizationId": "...", "templateId": "..." }
//!
//! error response:  { "code": "SMTP_AUTH_FAILED", "message": "..." }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_email, validate_required};

const MAX_SUBJECT_LEN: usize = 200;

// =============================================================================
// Error Codes
// =============================================================================

/// Error codes the email endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SmtpErrorCode {
    SmtpNotConfigured,
    SmtpAuthFailed,
    SmtpConnectionFailed,
    SmtpTimeout,
    SmtpRecipientRejected,
    /// Anything else, including codes this client does not know.
    SmtpError,
}

impl SmtpErrorCode {
    pub const ALL: [SmtpErrorCode; 6] = [
        SmtpErrorCode::SmtpNotConfigured,
        SmtpErrorCode::SmtpAuthFailed,
        SmtpErrorCode::SmtpConnectionFailed,
        SmtpErrorCode::SmtpTimeout,
        SmtpErrorCode::SmtpRecipientRejected,
        SmtpErrorCode::SmtpError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SmtpErrorCode::SmtpNotConfigured => "SMTP_NOT_CONFIGURED",
            SmtpErrorCode::SmtpAuthFailed => "SMTP_AUTH_FAILED",
            SmtpErrorCode::SmtpConnectionFailed => "SMTP_CONNECTION_FAILED",
            SmtpErrorCode::SmtpTimeout => "SMTP_TIMEOUT",
            SmtpErrorCode::SmtpRecipientRejected => "SMTP_RECIPIENT_REJECTED",
            SmtpErrorCode::SmtpError => "SMTP_ERROR",
        }
    }

    /// Maps a wire code; unknown codes become `SmtpError`.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code.trim()))
            .unwrap_or(SmtpErrorCode::SmtpError)
    }

    /// Message shown to the person who clicked "send".
    pub fn user_message(&self) -> &'static str {
        match self {
            SmtpErrorCode::SmtpNotConfigured => {
                "Email is not set up yet. Add your SMTP settings and try again."
            }
            SmtpErrorCode::SmtpAuthFailed => {
                "The mail server rejected the username or password. Check your SMTP credentials."
            }
            SmtpErrorCode::SmtpConnectionFailed => {
                "Could not reach the mail server. Check the host and port."
            }
            SmtpErrorCode::SmtpTimeout => "The mail server took too long to respond. Try again.",
            SmtpErrorCode::SmtpRecipientRejected => {
                "The recipient address was rejected. Check the email address."
            }
            SmtpErrorCode::SmtpError => "The email could not be sent.",
        }
    }
}

impl fmt::Display for SmtpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request
// =============================================================================

/// Body of the invoice email request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EmailRequest {
    pub invoice_id: String,
    pub recipient_email: String,
    pub subject: String,
    pub message: String,
    pub organization_id: String,
    pub template_id: String,
}

impl EmailRequest {
    /// Checks every field before anything goes on the wire.
    ///
    /// ## Errors
    /// `MissingTenant` for an empty organization, `Validation` otherwise.
    pub fn validate(&self) -> CoreResult<()> {
        if self.organization_id.trim().is_empty() {
            return Err(CoreError::MissingTenant);
        }
        validate_required("invoice id", &self.invoice_id)?;
        validate_required("template id", &self.template_id)?;
        validate_email(&self.recipient_email)?;

        let subject = validate_required("subject", &self.subject)?;
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(ValidationError::TooLong {
                field: "subject".to_string(),
                max: MAX_SUBJECT_LEN,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn request() -> EmailRequest {
        EmailRequest {
            invoice_id: "inv-1".to_string(),
            recipient_email: "billing@acme.io".to_string(),
            subject: "Invoice INV-0001".to_string(),
            message: "Please find your invoice attached.".to_string(),
            organization_id: "org-1".to_string(),
            template_id: "tpl-a4".to_string(),
        }
    }

    #[test]
    fn test_codes_round_trip_through_wire_names() {
        for code in SmtpErrorCode::ALL {
            assert_eq!(SmtpErrorCode::from_code(code.as_str()), code);
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_unknown_code_is_generic() {
        assert_eq!(SmtpErrorCode::from_code("SMTP_QUOTA"), SmtpErrorCode::SmtpError);
        assert_eq!(SmtpErrorCode::from_code(""), SmtpErrorCode::SmtpError);
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages: HashSet<_> = SmtpErrorCode::ALL.iter().map(|c| c.user_message()).collect();
        assert_eq!(messages.len(), SmtpErrorCode::ALL.len());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["recipientEmail"], "billing@acme.io");
        assert_eq!(value["organizationId"], "org-1");
        assert_eq!(value["templateId"], "tpl-a4");
    }

    #[test]
    fn test_validate() {
        assert!(request().validate().is_ok());

        let mut no_org = request();
        no_org.organization_id = " ".to_string();
        assert!(matches!(no_org.validate(), Err(CoreError::MissingTenant)));

        let mut bad_email = request();
        bad_email.recipient_email = "acme.io".to_string();
        assert!(matches!(bad_email.validate(), Err(CoreError::Validation(_))));

        let mut no_subject = request();
        no_subject.subject = String::new();
        assert!(no_subject.validate().is_err());
    }
}
