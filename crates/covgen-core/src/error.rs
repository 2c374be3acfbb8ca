//! Error types for Covgen billing.

use crate::ids::IdError;

/// Result type for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in billing operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Owner not found.
    #[error("owner not found: {owner_id}")]
    OwnerNotFound {
        /// The owner id that was not found.
        owner_id: i64,
    },

    /// Transaction not found.
    #[error("transaction not found: {transaction_id}")]
    TransactionNotFound {
        /// The transaction id that was not found.
        transaction_id: String,
    },

    /// External service error (Stripe, email delivery, activity feed).
    #[error("external service error: {service} - {message}")]
    ExternalService {
        /// The service that failed.
        service: String,
        /// Error message.
        message: String,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}
