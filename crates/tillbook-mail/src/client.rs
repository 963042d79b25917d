//! # Email Endpoint Client
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  send_invoice(&EmailRequest)                                            │
//! │       │                                                                 │
//! │       ├── request.validate()?        ← nothing sent on failure          │
//! │       ▼                                                                 │
//! │  POST {endpoint}  (JSON, camelCase)                                     │
//! │       │                                                                 │
//! │       ├── 2xx                       → Ok(())                            │
//! │       ├── non-2xx {code, message}   → MailError::Smtp(code)             │
//! │       ├── timed out                 → SMTP_TIMEOUT                      │
//! │       └── could not connect         → SMTP_CONNECTION_FAILED            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One attempt per call. The caller decides whether to try again.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use tillbook_core::notify::{EmailRequest, SmtpErrorCode};

use crate::error::{MailError, MailResult};

/// Where and how to reach the email endpoint.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl MailConfig {
    pub fn new(endpoint: Url) -> Self {
        MailConfig {
            endpoint,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body returned by the endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailClient {
    client: Client,
    config: MailConfig,
}

impl MailClient {
    pub fn new(config: MailConfig) -> MailResult<Self> {
        if !matches!(config.endpoint.scheme(), "http" | "https") {
            return Err(MailError::InvalidEndpoint(config.endpoint.to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::InvalidEndpoint(e.to_string()))?;
        Ok(MailClient { client, config })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }

    /// Sends one invoice email.
    pub async fn send_invoice(&self, request: &EmailRequest) -> MailResult<()> {
        request.validate()?;
        debug!(invoice_id = %request.invoice_id, endpoint = %self.config.endpoint, "Sending invoice email");

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let err = classify_transport(&e);
                warn!(invoice_id = %request.invoice_id, error = %e, code = ?err.code(), "Email request failed");
                err
            })?;

        let status = response.status();
        if status.is_success() {
            info!(invoice_id = %request.invoice_id, "Invoice email sent");
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(invoice_id = %request.invoice_id, status = %status, error = %e, "Failed to read email endpoint response body");
                String::new()
            }
        };
        let err = classify_response(status, &body);
        warn!(invoice_id = %request.invoice_id, status = %status, error = %err, "Email endpoint rejected request");
        Err(err)
    }
}

/// Maps a non-2xx response to a delivery error.
///
/// The body's `code` wins when present; otherwise the HTTP status decides.
pub fn classify_response(status: StatusCode, body: &str) -> MailError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(ErrorBody { code, message }) => (code, message),
        None => (None, None),
    };

    let code = match code {
        Some(code) => SmtpErrorCode::from_code(&code),
        None => match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SmtpErrorCode::SmtpTimeout,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
                SmtpErrorCode::SmtpConnectionFailed
            }
            _ => SmtpErrorCode::SmtpError,
        },
    };
    let message = message.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    MailError::smtp(code, message)
}

fn classify_transport(err: &reqwest::Error) -> MailError {
    let code = if err.is_timeout() {
        SmtpErrorCode::SmtpTimeout
    } else if err.is_connect() {
        SmtpErrorCode::SmtpConnectionFailed
    } else {
        SmtpErrorCode::SmtpError
    };
    MailError::smtp(code, err.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> EmailRequest {
        EmailRequest {
            invoice_id: "inv-1".to_string(),
            recipient_email: "billing@acme.io".to_string(),
            subject: "Invoice INV-0001".to_string(),
            message: "Attached.".to_string(),
            organization_id: "org-1".to_string(),
            template_id: "tpl-a4".to_string(),
        }
    }

    fn client(endpoint: &str, timeout: Duration) -> MailClient {
        MailClient::new(MailConfig::new(Url::parse(endpoint).unwrap()).timeout(timeout)).unwrap()
    }

    #[test]
    fn test_classify_uses_body_code() {
        let err = classify_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"code":"SMTP_AUTH_FAILED","message":"535 bad credentials"}"#,
        );
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpAuthFailed));
        assert!(err.to_string().contains("535"));
    }

    #[test]
    fn test_classify_falls_back_to_status() {
        let err = classify_response(StatusCode::GATEWAY_TIMEOUT, "upstream timeout");
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpTimeout));

        let err = classify_response(StatusCode::BAD_REQUEST, r#"{"code":"SOMETHING_NEW"}"#);
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpError));
    }

    #[test]
    fn test_non_http_endpoint_rejected() {
        let config = MailConfig::new(Url::parse("ftp://mail.example.com/send").unwrap());
        assert!(matches!(MailClient::new(config), Err(MailError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_send_posts_camel_case_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-invoice"))
            .and(body_partial_json(serde_json::json!({
                "invoiceId": "inv-1",
                "recipientEmail": "billing@acme.io",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&format!("{}/send-invoice", server.uri()), Duration::from_secs(5));
        client.send_invoice(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_endpoint_error_code_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({ "code": "SMTP_RECIPIENT_REJECTED", "message": "550" })),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri(), Duration::from_secs(5))
            .send_invoice(&request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpRecipientRejected));
    }

    #[tokio::test]
    async fn test_truncated_error_body_falls_back_to_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\n{\"co")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let err = client(&format!("http://{}/send", addr), Duration::from_secs(5))
            .send_invoice(&request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpConnectionFailed));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let err = client(&server.uri(), Duration::from_millis(50))
            .send_invoice(&request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpTimeout));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let err = client("http://127.0.0.1:1/send", Duration::from_secs(5))
            .send_invoice(&request())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(SmtpErrorCode::SmtpConnectionFailed));
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut bad = request();
        bad.recipient_email = "not-an-email".to_string();
        let err = client(&server.uri(), Duration::from_secs(5))
            .send_invoice(&bad)
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Invalid(_)));
        assert_eq!(err.code(), None);
    }
}
