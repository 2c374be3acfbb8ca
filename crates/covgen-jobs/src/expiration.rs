//! The credit-expiration job.
//!
//! Finds ledger rows whose credits have expired, folds them into one
//! offsetting `expiration` row per owner, and flips the originals' type to
//! `expiration` so future scans skip them. Rows already flipped are
//! excluded by the scan filter, which makes re-runs naturally idempotent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use covgen_core::{CreditTransaction, OwnerId, Result, TransactionId};
use covgen_store::Store;

/// Result of one expiration run.
#[derive(Debug, Serialize)]
pub struct ExpirationReport {
    /// Number of owners that had credits expire.
    pub expired: usize,

    /// Per-owner breakdown.
    pub owners: Vec<OwnerExpiration>,

    /// Grand total expired across all owners, in whole dollars.
    pub total_expired: i64,
}

/// One owner's expired credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerExpiration {
    /// The owner.
    pub owner_id: OwnerId,

    /// Total amount expired, in whole dollars.
    pub expired_amount: i64,

    /// Number of ledger rows that expired.
    pub credit_count: usize,
}

/// Expire all overdue credits as of `now`.
///
/// Write failures are isolated per owner: the owner is logged and skipped
/// (no partial retry within this run), and the next run picks the rows up
/// again since they were never flipped.
///
/// # Errors
///
/// Returns an error only when the expired-row scan itself fails.
pub fn expire_credits(store: &dyn Store, now: DateTime<Utc>) -> Result<ExpirationReport> {
    let expired_rows = store.list_expired_credits(now)?;

    // BTreeMap for a deterministic per-owner order in logs and reports.
    let mut by_owner: BTreeMap<OwnerId, Vec<CreditTransaction>> = BTreeMap::new();
    for row in expired_rows {
        by_owner.entry(row.owner_id).or_default().push(row);
    }

    tracing::info!(owners = by_owner.len(), "Starting credit expiration");

    let mut owners = Vec::with_capacity(by_owner.len());
    let mut total_expired = 0;

    for (owner_id, rows) in by_owner {
        let expired_amount: i64 = rows.iter().map(|tx| tx.amount_usd).sum();
        let ids: Vec<TransactionId> = rows.iter().map(|tx| tx.id).collect();
        let offset = CreditTransaction::expiration_offset(owner_id, expired_amount);

        match store.expire_owner_credits(owner_id, &ids, &offset) {
            Ok(balance) => {
                tracing::info!(
                    owner_id = %owner_id,
                    expired_amount = %expired_amount,
                    credit_count = ids.len(),
                    new_balance = %balance,
                    "Expired credits"
                );
                total_expired += expired_amount;
                owners.push(OwnerExpiration {
                    owner_id,
                    expired_amount,
                    credit_count: ids.len(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    owner_id = %owner_id,
                    error = %e,
                    "Skipping owner: expiration write failed"
                );
            }
        }
    }

    Ok(ExpirationReport {
        expired: owners.len(),
        owners,
        total_expired,
    })
}
