//! Resend API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use covgen_core::OutboundEmail;

use super::{Mailer, SendOutcome};

/// Error type for Resend operations.
#[derive(Debug, thiserror::Error)]
pub enum ResendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resend API returned an error.
    #[error("Resend API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },
}

/// Request body for sending an email.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Response body for an accepted email.
#[derive(Debug, Deserialize)]
struct SentEmail {
    id: String,
}

/// Resend error payload.
#[derive(Debug, Deserialize)]
struct ResendErrorResponse {
    #[serde(default)]
    message: String,
}

/// Resend API mailer.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    /// Resend API base URL.
    const BASE_URL: &'static str = "https://api.resend.com";

    /// Create a new mailer.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Resend API key (`re_...`)
    /// * `from` - Sender address (e.g. `"Covgen <team@covgen.dev>"`)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self::with_base_url(Self::BASE_URL, api_key, from)
    }

    /// Create a mailer against a non-default API host (test servers).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    /// Send one email through the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API rejects it.
    pub async fn send_email(&self, email: &OutboundEmail) -> Result<String, ResendError> {
        let url = format!("{}/emails", self.base_url);
        let request = SendEmailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let sent: SentEmail = response.json().await?;
            return Ok(sent.id);
        }

        let message = response
            .json::<ResendErrorResponse>()
            .await
            .map(|e| e.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));

        Err(ResendError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> SendOutcome {
        match self.send_email(email).await {
            Ok(email_id) => SendOutcome::Sent { email_id },
            Err(e) => SendOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
