//! Credit ledger types.
//!
//! Every balance-affecting event is one append-only ledger row. The cached
//! owner balance is derived from these rows; the store writes both sides in
//! one atomic batch. The one exception to "never mutated" is the expiration
//! job, which flips processed rows' type to `Expiration` so they are
//! excluded from future expiry scans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OwnerId, TransactionId};

/// A credit transaction representing a balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction id (ULID for time-ordering).
    pub id: TransactionId,

    /// The owner whose balance was affected.
    pub owner_id: OwnerId,

    /// Amount in whole dollars. Positive = credit, negative = debit.
    pub amount_usd: i64,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Usage record that caused a deduction, if any.
    pub usage_id: Option<i64>,

    /// Stripe payment intent behind a purchase or auto-reload charge.
    pub stripe_payment_intent_id: Option<String>,

    /// When these credits expire, if they do.
    pub expires_at: Option<DateTime<Utc>>,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a new purchase transaction.
    #[must_use]
    pub fn purchase(
        owner_id: OwnerId,
        amount_usd: i64,
        payment_intent_id: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd,
            transaction_type: TransactionType::Purchase,
            usage_id: None,
            stripe_payment_intent_id: payment_intent_id,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Create a new usage transaction (deduction).
    #[must_use]
    pub fn usage(owner_id: OwnerId, amount_usd: i64, usage_id: i64) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd: -amount_usd.abs(), // Always negative for usage
            transaction_type: TransactionType::Usage,
            usage_id: Some(usage_id),
            stripe_payment_intent_id: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new auto-reload transaction for a settled charge.
    #[must_use]
    pub fn auto_reload(owner_id: OwnerId, amount_usd: i64, payment_intent_id: String) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd,
            transaction_type: TransactionType::AutoReload,
            usage_id: None,
            stripe_payment_intent_id: Some(payment_intent_id),
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Create the offsetting row the expiration job writes per owner.
    ///
    /// `expired_total` is the (positive) sum of the expired rows; the
    /// offsetting amount is its negation. Never carries an expiry itself.
    #[must_use]
    pub fn expiration_offset(owner_id: OwnerId, expired_total: i64) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd: -expired_total,
            transaction_type: TransactionType::Expiration,
            usage_id: None,
            stripe_payment_intent_id: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Create a new refund transaction.
    #[must_use]
    pub fn refund(owner_id: OwnerId, amount_usd: i64, payment_intent_id: Option<String>) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd,
            transaction_type: TransactionType::Refund,
            usage_id: None,
            stripe_payment_intent_id: payment_intent_id,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Create a trial credit grant, typically expiring.
    #[must_use]
    pub fn trial(owner_id: OwnerId, amount_usd: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd,
            transaction_type: TransactionType::Trial,
            usage_id: None,
            stripe_payment_intent_id: None,
            expires_at: Some(expires_at),
            created_at: Utc::now(),
        }
    }

    /// Create a promotional or support credit grant.
    #[must_use]
    pub fn grant(owner_id: OwnerId, amount_usd: i64, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: TransactionId::generate(),
            owner_id,
            amount_usd,
            transaction_type: TransactionType::Grant,
            usage_id: None,
            stripe_payment_intent_id: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Whether this row is an unexpired-but-expirable credit at `now`.
    #[must_use]
    pub fn expired_as_of(&self, now: DateTime<Utc>) -> bool {
        self.transaction_type != TransactionType::Expiration
            && self.expires_at.is_some_and(|at| at < now)
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Owner purchased credits.
    Purchase,

    /// Credits deducted for usage.
    Usage,

    /// Automatic reload charge settled.
    AutoReload,

    /// Expiration: both the offsetting row the expiry job writes and the
    /// marker it flips processed originals to.
    Expiration,

    /// Refund issued.
    Refund,

    /// Trial credits granted at install.
    Trial,

    /// Promotional or support credits.
    Grant,
}

impl TransactionType {
    /// Whether rows of this type count toward the monthly spending cap.
    ///
    /// Only money coming in via reload or purchase counts; usage and the
    /// other types are excluded.
    #[must_use]
    pub const fn counts_toward_spending_limit(&self) -> bool {
        matches!(self, Self::Purchase | Self::AutoReload)
    }

    /// Stable wire name, matching the serde representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Usage => "usage",
            Self::AutoReload => "auto_reload",
            Self::Expiration => "expiration",
            Self::Refund => "refund",
            Self::Trial => "trial",
            Self::Grant => "grant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn usage_transaction_is_negative() {
        let tx = CreditTransaction::usage(OwnerId::new(1), 5, 991);
        assert_eq!(tx.amount_usd, -5);
        assert_eq!(tx.transaction_type, TransactionType::Usage);
        assert_eq!(tx.usage_id, Some(991));
    }

    #[test]
    fn expiration_offset_negates_the_total() {
        let tx = CreditTransaction::expiration_offset(OwnerId::new(1), 9);
        assert_eq!(tx.amount_usd, -9);
        assert_eq!(tx.transaction_type, TransactionType::Expiration);
        assert!(tx.expires_at.is_none());
    }

    #[test]
    fn spending_limit_classification() {
        assert!(TransactionType::Purchase.counts_toward_spending_limit());
        assert!(TransactionType::AutoReload.counts_toward_spending_limit());
        assert!(!TransactionType::Usage.counts_toward_spending_limit());
        assert!(!TransactionType::Refund.counts_toward_spending_limit());
        assert!(!TransactionType::Trial.counts_toward_spending_limit());
        assert!(!TransactionType::Grant.counts_toward_spending_limit());
        assert!(!TransactionType::Expiration.counts_toward_spending_limit());
    }

    #[test]
    fn expired_as_of_respects_type_and_timestamp() {
        let now = Utc::now();
        let owner = OwnerId::new(1);

        let live = CreditTransaction::trial(owner, 10, now + Duration::days(1));
        assert!(!live.expired_as_of(now));

        let stale = CreditTransaction::trial(owner, 10, now - Duration::days(1));
        assert!(stale.expired_as_of(now));

        // Rows already flipped to expiration are never picked up again.
        let mut flipped = CreditTransaction::trial(owner, 10, now - Duration::days(1));
        flipped.transaction_type = TransactionType::Expiration;
        assert!(!flipped.expired_as_of(now));
    }

    #[test]
    fn wire_names_match_serde() {
        let json = serde_json::to_string(&TransactionType::AutoReload).unwrap();
        assert_eq!(json, "\"auto_reload\"");
        for ty in [
            TransactionType::Purchase,
            TransactionType::Usage,
            TransactionType::AutoReload,
            TransactionType::Expiration,
            TransactionType::Refund,
            TransactionType::Trial,
            TransactionType::Grant,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }
}
