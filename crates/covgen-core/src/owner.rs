//! Owner (billing account) types.
//!
//! An owner is the billing account behind an installation: a user or an
//! organization. Owners carry the cached credit balance, the auto-reload
//! configuration, and the optional monthly spending cap the reload sweep
//! must respect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OwnerId;

/// Default auto-reload trigger threshold in whole dollars.
pub const DEFAULT_RELOAD_THRESHOLD_USD: i64 = 20;

/// Default auto-reload top-up target in whole dollars.
pub const DEFAULT_RELOAD_TARGET_USD: i64 = 100;

/// A billing account for a user or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    /// The owner id (account id of the installing user or organization).
    pub id: OwnerId,

    /// Account login name (e.g. the organization slug).
    pub name: String,

    /// Human display name, when known.
    pub display_name: Option<String>,

    /// Address lifecycle emails are sent to.
    pub billing_email: String,

    /// Cached credit balance in whole dollars.
    ///
    /// Derived from the ledger; maintained by the store's compound write
    /// operations, never computed here.
    pub credit_balance_usd: i64,

    /// Auto-reload configuration.
    pub auto_reload: AutoReload,

    /// Monthly spending cap in whole dollars, if configured.
    pub max_monthly_spend_usd: Option<i64>,

    /// Stripe customer id for charging a saved payment method.
    pub stripe_customer_id: Option<String>,

    /// Current subscription, if any.
    pub subscription: Option<Subscription>,

    /// Number of currently active installations.
    pub active_installations: u32,

    /// When the product was first installed for this owner.
    pub installed_at: DateTime<Utc>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    /// Create a new owner with zero balance and auto-reload disabled.
    #[must_use]
    pub fn new(id: OwnerId, name: impl Into<String>, billing_email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            display_name: None,
            billing_email: billing_email.into(),
            credit_balance_usd: 0,
            auto_reload: AutoReload::default(),
            max_monthly_spend_usd: None,
            stripe_customer_id: None,
            subscription: None,
            active_installations: 1,
            installed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this owner can be considered by the auto-reload sweep:
    /// reload is enabled and a Stripe customer is on file.
    #[must_use]
    pub fn auto_reload_configured(&self) -> bool {
        self.auto_reload.enabled
            && self
                .stripe_customer_id
                .as_deref()
                .is_some_and(|id| !id.is_empty())
    }

    /// Whether the balance has fallen to or below the reload trigger.
    #[must_use]
    pub fn below_reload_threshold(&self) -> bool {
        self.credit_balance_usd <= self.auto_reload.threshold_usd
    }

    /// Amount needed to bring the balance up to the reload target.
    ///
    /// May be zero or negative when the balance already meets the target;
    /// callers must check before charging.
    #[must_use]
    pub fn amount_to_target(&self) -> i64 {
        self.auto_reload.target_usd - self.credit_balance_usd
    }

    /// Check if the owner has an active paid subscription.
    #[must_use]
    pub fn has_active_subscription(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| s.status == SubscriptionStatus::Active)
    }

    /// Whole days since the product was installed.
    #[must_use]
    pub fn account_age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.installed_at).num_days()
    }

    /// First name for email greetings: the display name's first word,
    /// falling back to the login.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.display_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or(&self.name)
    }
}

/// Auto-reload configuration.
///
/// When enabled, the sweep charges the saved payment method back up to
/// `target_usd` whenever the balance drops to `threshold_usd` or below.
/// `target_usd > threshold_usd` is expected but not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoReload {
    /// Whether auto-reload is enabled.
    pub enabled: bool,

    /// Trigger a reload when the balance drops to this amount or below.
    pub threshold_usd: i64,

    /// Top the balance back up to this amount.
    pub target_usd: i64,
}

impl Default for AutoReload {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_usd: DEFAULT_RELOAD_THRESHOLD_USD,
            target_usd: DEFAULT_RELOAD_TARGET_USD,
        }
    }
}

/// A subscription to a paid plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Plan identifier (e.g. "team", "enterprise").
    pub plan: String,

    /// Current status of the subscription.
    pub status: SubscriptionStatus,

    /// Start of the current billing period.
    pub current_period_start: DateTime<Utc>,

    /// End of the current billing period.
    pub current_period_end: DateTime<Utc>,
}

/// Status of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active.
    Active,

    /// Subscription was cancelled (still active until period end).
    Cancelled,

    /// Payment failed, subscription is past due.
    PastDue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn owner() -> Owner {
        Owner::new(OwnerId::new(1), "acme", "billing@acme.dev")
    }

    #[test]
    fn new_owner_has_zero_balance_and_reload_disabled() {
        let owner = owner();
        assert_eq!(owner.credit_balance_usd, 0);
        assert!(!owner.auto_reload.enabled);
        assert!(!owner.auto_reload_configured());
    }

    #[test]
    fn reload_configured_requires_stripe_customer() {
        let mut owner = owner();
        owner.auto_reload.enabled = true;
        assert!(!owner.auto_reload_configured());

        owner.stripe_customer_id = Some(String::new());
        assert!(!owner.auto_reload_configured());

        owner.stripe_customer_id = Some("cus_123".into());
        assert!(owner.auto_reload_configured());
    }

    #[test]
    fn threshold_gate_is_inclusive() {
        let mut owner = owner();
        owner.auto_reload.threshold_usd = 20;

        owner.credit_balance_usd = 21;
        assert!(!owner.below_reload_threshold());

        owner.credit_balance_usd = 20;
        assert!(owner.below_reload_threshold());
    }

    #[test]
    fn amount_to_target_can_be_non_positive() {
        let mut owner = owner();
        owner.auto_reload.target_usd = 100;
        owner.credit_balance_usd = 120;
        assert_eq!(owner.amount_to_target(), -20);
    }

    #[test]
    fn first_name_prefers_display_name() {
        let mut owner = owner();
        assert_eq!(owner.first_name(), "acme");

        owner.display_name = Some("Ada Lovelace".into());
        assert_eq!(owner.first_name(), "Ada");
    }

    #[test]
    fn account_age_in_whole_days() {
        let mut owner = owner();
        let now = Utc::now();
        owner.installed_at = now - Duration::days(3) - Duration::hours(5);
        assert_eq!(owner.account_age_days(now), 3);
    }
}
