//! Stripe API types.
//!
//! Only the subset of the payment-intent surface the reload sweep touches.

use serde::Deserialize;

/// A Stripe payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Payment intent id (`pi_...`).
    pub id: String,

    /// Status: `succeeded`, `requires_action`, `requires_payment_method`...
    pub status: String,

    /// Amount in the smallest currency unit (cents for USD).
    pub amount: i64,

    /// Stripe customer id, if attached.
    #[serde(default)]
    pub customer: Option<String>,
}

/// Stripe error response envelope.
#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    /// The error payload.
    pub error: StripeErrorBody,
}

/// Stripe error payload.
#[derive(Debug, Deserialize)]
pub struct StripeErrorBody {
    /// Error type (e.g. `card_error`, `invalid_request_error`).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Error code (e.g. `card_declined`).
    #[serde(default)]
    pub code: Option<String>,
}
