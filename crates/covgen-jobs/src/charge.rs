//! Payment charger contract.
//!
//! The auto-reload sweep charges through this trait. Implementations must
//! return a structured outcome for every failure mode — declines, unknown
//! customers, transport errors — so that one owner's bad card can never
//! abort a sweep.

use async_trait::async_trait;
use serde::Serialize;

/// A request to charge a saved payment method.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Stripe customer id.
    pub customer_id: String,

    /// Amount in whole dollars.
    pub amount_usd: i64,

    /// Human-readable description attached to the charge.
    pub description: String,

    /// Metadata key/value pairs attached to the charge.
    pub metadata: Vec<(String, String)>,
}

/// Outcome of a charge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChargeOutcome {
    /// The charge settled.
    Succeeded {
        /// Payment intent id of the settled charge.
        payment_intent_id: String,
    },

    /// The charge did not settle.
    Failed {
        /// Error text from the payment processor.
        error: String,
    },
}

/// Charges saved payment methods.
#[async_trait]
pub trait PaymentCharger: Send + Sync {
    /// Attempt to charge. Never returns a transport-level `Err`; every
    /// failure is folded into [`ChargeOutcome::Failed`].
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome;
}
