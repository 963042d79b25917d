//! # tillbook-mail: Invoice Email Client
//!
//! Thin client for the hosted email endpoint. The endpoint talks SMTP; this
//! crate validates the request, posts it, and turns every failure into an
//! [`SmtpErrorCode`](tillbook_core::notify::SmtpErrorCode) with a message a
//! cashier can act on.
//!
//! ```rust,ignore
//! use tillbook_mail::{MailClient, MailConfig};
//!
//! let client = MailClient::new(MailConfig::new(endpoint))?;
//! if let Err(e) = client.send_invoice(&request).await {
//!     eprintln!("{}", e.user_message());
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{classify_response, MailClient, MailConfig};
pub use error::{MailError, MailResult};
