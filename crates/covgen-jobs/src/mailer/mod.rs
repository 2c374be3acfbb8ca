//! Email delivery.

pub mod resend;

use async_trait::async_trait;
use serde::Serialize;

use covgen_core::OutboundEmail;

pub use resend::{ResendError, ResendMailer};

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The provider accepted the email.
    Sent {
        /// Provider-side id of the accepted email.
        email_id: String,
    },

    /// Delivery failed.
    Failed {
        /// Error text.
        error: String,
    },
}

/// Delivers lifecycle emails.
///
/// Like the payment charger, implementations fold every failure mode into
/// the structured outcome; a bounced provider call must not abort a run.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Attempt delivery.
    async fn send(&self, email: &OutboundEmail) -> SendOutcome;
}
