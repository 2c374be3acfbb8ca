//! The auto-reload sweep.
//!
//! Walks every owner with auto-reload configured, charges those whose
//! balance has fallen to the trigger threshold, and records the settled
//! charge in the ledger. One owner's failure never aborts the sweep: each
//! owner is mapped to a [`ReloadOutcome`] by a function that cannot fail,
//! and failures raise an operator alert.
//!
//! Nothing here deduplicates concurrent sweeps. The post-charge balance
//! rising above the threshold re-arms the gate for the next run, but two
//! overlapping sweeps could double-charge a slow-to-settle owner; the
//! caller must serialize invocations (single cron slot).

use serde::Serialize;

use covgen_core::{CreditTransaction, Owner, OwnerId, Result};
use covgen_store::Store;

use crate::alert::Alerter;
use crate::charge::{ChargeOutcome, ChargeRequest, PaymentCharger};
use crate::spending_limit::validate_spending_limit;

/// Aggregate result of one sweep.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    /// Whether the sweep ran to completion.
    pub success: bool,

    /// Number of eligible owners processed.
    pub processed: usize,

    /// Per-owner outcomes, in no guaranteed order.
    pub results: Vec<OwnerReloadResult>,
}

impl SweepReport {
    /// Number of owners actually charged.
    #[must_use]
    pub fn charged(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ReloadOutcome::Charged { .. }))
            .count()
    }
}

/// Outcome of one owner's reload attempt.
#[derive(Debug, Serialize)]
pub struct OwnerReloadResult {
    /// The owner.
    pub owner_id: OwnerId,

    /// What happened.
    #[serde(flatten)]
    pub outcome: ReloadOutcome,
}

/// What happened to one eligible owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// A charge settled and was recorded.
    Charged {
        /// Amount charged in whole dollars.
        amount_usd: i64,
        /// Stripe payment intent id.
        payment_intent_id: String,
    },

    /// The owner was skipped by configuration or policy.
    Skipped {
        /// Why the owner was skipped.
        reason: String,
    },

    /// The charge or its recording failed.
    Failed {
        /// Error text.
        error: String,
    },
}

/// Run one auto-reload sweep.
///
/// # Errors
///
/// Returns an error only when the eligible-owner list itself cannot be
/// read; everything downstream is folded into per-owner outcomes.
pub async fn run_auto_reload_sweep(
    store: &dyn Store,
    charger: &dyn PaymentCharger,
    alerter: &dyn Alerter,
) -> Result<SweepReport> {
    let owners = store.list_auto_reload_owners()?;

    let eligible: Vec<Owner> = owners
        .into_iter()
        .filter(Owner::below_reload_threshold)
        .collect();

    tracing::info!(eligible = eligible.len(), "Starting auto-reload sweep");

    let mut results = Vec::with_capacity(eligible.len());

    for owner in eligible {
        let outcome = reload_owner(store, charger, &owner).await;

        match &outcome {
            ReloadOutcome::Charged {
                amount_usd,
                payment_intent_id,
            } => {
                tracing::info!(
                    owner_id = %owner.id,
                    amount_usd = %amount_usd,
                    payment_intent_id = %payment_intent_id,
                    "Auto-reload charged"
                );
            }
            ReloadOutcome::Skipped { reason } => {
                tracing::debug!(owner_id = %owner.id, reason = %reason, "Auto-reload skipped");
            }
            ReloadOutcome::Failed { error } => {
                tracing::error!(owner_id = %owner.id, error = %error, "Auto-reload failed");
                alerter
                    .notify(&format!(
                        "Auto-reload failed for owner {}: attempted ${}, error: {error}",
                        owner.id,
                        owner.amount_to_target().max(0),
                    ))
                    .await;
            }
        }

        results.push(OwnerReloadResult {
            owner_id: owner.id,
            outcome,
        });
    }

    Ok(SweepReport {
        success: true,
        processed: results.len(),
        results,
    })
}

/// Process one owner. Cannot fail the sweep: every error path collapses
/// into a [`ReloadOutcome`].
async fn reload_owner(
    store: &dyn Store,
    charger: &dyn PaymentCharger,
    owner: &Owner,
) -> ReloadOutcome {
    let amount_to_purchase = owner.amount_to_target();
    if amount_to_purchase <= 0 {
        return ReloadOutcome::Skipped {
            reason: "Target amount would be negative or zero".to_string(),
        };
    }

    let decision = match validate_spending_limit(store, owner, amount_to_purchase) {
        Ok(decision) => decision,
        Err(e) => {
            return ReloadOutcome::Failed {
                error: format!("spending limit check failed: {e}"),
            }
        }
    };

    if !decision.allowed {
        return ReloadOutcome::Skipped {
            reason: decision.reason,
        };
    }

    let amount_usd = decision.adjusted_amount_usd;
    if amount_usd <= 0 {
        return ReloadOutcome::Skipped {
            reason: "Adjusted amount is zero due to spending limit".to_string(),
        };
    }

    // The work list guarantees a Stripe customer; re-checked so this
    // function stands alone.
    let Some(customer_id) = owner.stripe_customer_id.clone().filter(|id| !id.is_empty()) else {
        return ReloadOutcome::Skipped {
            reason: "No Stripe customer on file".to_string(),
        };
    };

    let request = ChargeRequest {
        customer_id,
        amount_usd,
        description: format!("Auto-reload: ${amount_usd} of Covgen credits for {}", owner.name),
        metadata: vec![
            ("kind".to_string(), "auto_reload".to_string()),
            (
                "trigger_balance_usd".to_string(),
                owner.credit_balance_usd.to_string(),
            ),
            (
                "threshold_usd".to_string(),
                owner.auto_reload.threshold_usd.to_string(),
            ),
            (
                "target_usd".to_string(),
                owner.auto_reload.target_usd.to_string(),
            ),
        ],
    };

    match charger.charge(&request).await {
        ChargeOutcome::Succeeded { payment_intent_id } => {
            let tx =
                CreditTransaction::auto_reload(owner.id, amount_usd, payment_intent_id.clone());

            match store.apply_transaction(&tx) {
                Ok(_) => ReloadOutcome::Charged {
                    amount_usd,
                    payment_intent_id,
                },
                Err(e) => ReloadOutcome::Failed {
                    error: format!(
                        "charge {payment_intent_id} settled but ledger write failed: {e}"
                    ),
                },
            }
        }
        ChargeOutcome::Failed { error } => ReloadOutcome::Failed { error },
    }
}
