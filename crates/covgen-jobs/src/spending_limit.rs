//! Monthly spending-limit validation for auto-reload charges.
//!
//! The cap counts money coming in via purchase or auto-reload this
//! calendar month; usage and other row types are excluded. The decision
//! itself is a pure computation so the clamp rules are testable without a
//! store.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use covgen_core::{Owner, Result};
use covgen_store::Store;

/// Decision on whether and how much an auto-reload charge may proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendingLimitDecision {
    /// Whether any charge may proceed.
    pub allowed: bool,

    /// The amount that may actually be charged (0 when denied).
    pub adjusted_amount_usd: i64,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Month-to-date spending, when a limit is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_monthly_spending: Option<i64>,

    /// The configured limit, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_limit: Option<i64>,

    /// Remaining headroom under the limit, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_limit: Option<i64>,

    /// Whether the requested amount was reduced to fit the limit.
    pub is_adjusted: bool,
}

/// Pure decision: clamp `requested_usd` against the owner's monthly cap.
#[must_use]
pub fn decide_spending_limit(
    limit: Option<i64>,
    monthly_spending: i64,
    requested_usd: i64,
) -> SpendingLimitDecision {
    let Some(limit) = limit else {
        return SpendingLimitDecision {
            allowed: true,
            adjusted_amount_usd: requested_usd,
            reason: "No spending limit set".to_string(),
            current_monthly_spending: None,
            spending_limit: None,
            remaining_limit: None,
            is_adjusted: false,
        };
    };

    let remaining = limit - monthly_spending;

    if remaining <= 0 {
        return SpendingLimitDecision {
            allowed: false,
            adjusted_amount_usd: 0,
            reason: "Monthly spending limit already reached".to_string(),
            current_monthly_spending: Some(monthly_spending),
            spending_limit: Some(limit),
            remaining_limit: Some(remaining),
            is_adjusted: false,
        };
    }

    let adjusted = requested_usd.min(remaining);
    let is_adjusted = adjusted < requested_usd;
    let reason = if is_adjusted {
        "Amount reduced to stay within monthly spending limit".to_string()
    } else {
        "Within monthly spending limit".to_string()
    };

    SpendingLimitDecision {
        allowed: true,
        adjusted_amount_usd: adjusted,
        reason,
        current_monthly_spending: Some(monthly_spending),
        spending_limit: Some(limit),
        remaining_limit: Some(remaining),
        is_adjusted,
    }
}

/// First instant of the calendar month containing `now`.
#[must_use]
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Validate a requested auto-reload amount against the owner's limit,
/// reading month-to-date spending from the ledger.
///
/// Pure read + compute; no side effects.
///
/// # Errors
///
/// Returns an error if the ledger cannot be read.
pub fn validate_spending_limit(
    store: &dyn Store,
    owner: &Owner,
    requested_usd: i64,
) -> Result<SpendingLimitDecision> {
    let Some(limit) = owner.max_monthly_spend_usd else {
        return Ok(decide_spending_limit(None, 0, requested_usd));
    };

    let since = month_start(Utc::now());
    let monthly_spending = store.monthly_limited_inflow(owner.id, since)?;

    Ok(decide_spending_limit(
        Some(limit),
        monthly_spending,
        requested_usd,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn no_limit_allows_full_amount() {
        let decision = decide_spending_limit(None, 0, 80);
        assert!(decision.allowed);
        assert_eq!(decision.adjusted_amount_usd, 80);
        assert_eq!(decision.reason, "No spending limit set");
        assert!(!decision.is_adjusted);
        assert!(decision.spending_limit.is_none());
    }

    #[test]
    fn under_limit_allows_full_amount() {
        let decision = decide_spending_limit(Some(5000), 1000, 100);
        assert!(decision.allowed);
        assert_eq!(decision.adjusted_amount_usd, 100);
        assert!(!decision.is_adjusted);
        assert_eq!(decision.remaining_limit, Some(4000));
    }

    #[test]
    fn near_limit_clamps_the_amount() {
        let decision = decide_spending_limit(Some(5000), 4980, 100);
        assert!(decision.allowed);
        assert_eq!(decision.adjusted_amount_usd, 20);
        assert!(decision.is_adjusted);
        assert_eq!(decision.current_monthly_spending, Some(4980));
        assert_eq!(decision.remaining_limit, Some(20));
    }

    #[test]
    fn at_or_over_limit_denies() {
        for spent in [5000, 5400] {
            let decision = decide_spending_limit(Some(5000), spent, 100);
            assert!(!decision.allowed);
            assert_eq!(decision.adjusted_amount_usd, 0);
            assert_eq!(decision.reason, "Monthly spending limit already reached");
        }
    }

    #[test]
    fn month_start_is_the_first_at_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 15, 30, 9).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap()
        );
        // Rows from the tail of last month fall outside the window.
        let late_july = Utc.with_ymd_and_hms(2026, 7, 31, 23, 59, 0).unwrap();
        assert!(late_july < month_start(now));
        assert!(now - month_start(now) < Duration::days(32));
    }
}
