//! Stripe API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::charge::{ChargeOutcome, ChargeRequest, PaymentCharger};

use super::types::{PaymentIntent, StripeErrorResponse};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },
}

/// Stripe-backed payment charger.
///
/// Creates confirmed off-session payment intents against the customer's
/// saved default payment method.
#[derive(Debug, Clone)]
pub struct StripeCharger {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StripeCharger {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Create a new charger.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(Self::BASE_URL, api_key)
    }

    /// Create a charger against a non-default API host (test servers).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create and confirm an off-session payment intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Stripe rejects the charge.
    pub async fn create_payment_intent(
        &self,
        request: &ChargeRequest,
    ) -> Result<PaymentIntent, StripeError> {
        // Stripe amounts are in cents; the ledger is whole dollars.
        let amount_cents = request.amount_usd * 100;

        let mut params = vec![
            ("amount".to_string(), amount_cents.to_string()),
            ("currency".to_string(), "usd".to_string()),
            ("customer".to_string(), request.customer_id.clone()),
            ("description".to_string(), request.description.clone()),
            ("confirm".to_string(), "true".to_string()),
            ("off_session".to_string(), "true".to_string()),
        ];

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        tracing::debug!(
            customer = %request.customer_id,
            amount_cents = %amount_cents,
            "Creating Stripe payment intent"
        );

        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[async_trait]
impl PaymentCharger for StripeCharger {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome {
        match self.create_payment_intent(request).await {
            Ok(intent) if intent.status == "succeeded" => ChargeOutcome::Succeeded {
                payment_intent_id: intent.id,
            },
            Ok(intent) => ChargeOutcome::Failed {
                error: format!("payment intent {} not settled: {}", intent.id, intent.status),
            },
            Err(e) => ChargeOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}
