//! `RocksDB` storage layer for Covgen billing.
//!
//! This crate provides persistent storage for owners, the credit ledger,
//! and the sent-email log using `RocksDB` with column families.
//!
//! # Architecture
//!
//! - `owners`: primary owner records, keyed by big-endian owner id
//! - `transactions`: ledger rows, keyed by `transaction_id` (ULID)
//! - `transactions_by_owner`: index for listing ledger rows per owner
//! - `sent_emails`: lifecycle-email idempotency log, keyed by
//!   `owner_id || email_key`
//!
//! There is no database-side trigger here: the cached owner balance is
//! maintained by the compound operations (`apply_transaction`,
//! `expire_owner_credits`), which write the ledger row and the recomputed
//! balance in one atomic batch.
//!
//! # Example
//!
//! ```no_run
//! use covgen_store::{RocksStore, Store};
//! use covgen_core::{Owner, OwnerId, CreditTransaction};
//!
//! let store = RocksStore::open("/tmp/covgen-db").unwrap();
//!
//! let owner = Owner::new(OwnerId::new(42), "acme", "billing@acme.dev");
//! store.put_owner(&owner).unwrap();
//!
//! let tx = CreditTransaction::purchase(owner.id, 50, None, None);
//! let balance = store.apply_transaction(&tx).unwrap();
//! assert_eq!(balance, 50);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use covgen_core::{CreditTransaction, EmailKey, Owner, OwnerId, TransactionId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations behind the same job code.
pub trait Store: Send + Sync {
    // =========================================================================
    // Owner Operations
    // =========================================================================

    /// Insert or update an owner record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_owner(&self, owner: &Owner) -> Result<()>;

    /// Get an owner by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_owner(&self, owner_id: OwnerId) -> Result<Option<Owner>>;

    /// List owners with auto-reload enabled and a Stripe customer on file.
    ///
    /// This is the auto-reload sweep's work list; the balance-vs-threshold
    /// gate is applied by the sweep, not here.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_auto_reload_owners(&self) -> Result<Vec<Owner>>;

    /// List owners with at least one active installation.
    ///
    /// This is the drip-email engine's work list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_installed_owners(&self) -> Result<Vec<Owner>>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Insert a ledger row and apply its amount to the owner's cached
    /// balance in one atomic write.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the owner doesn't exist.
    fn apply_transaction(&self, transaction: &CreditTransaction) -> Result<i64>;

    /// Get a ledger row by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>>;

    /// List ledger rows for an owner, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_owner(
        &self,
        owner_id: OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    /// Sum the owner's positive purchase/auto-reload amounts created at or
    /// after `since`.
    ///
    /// This is the month-to-date figure the spending-limit validator caps
    /// against; usage and other row types are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn monthly_limited_inflow(&self, owner_id: OwnerId, since: DateTime<Utc>) -> Result<i64>;

    /// Whether the owner has ever purchased credits (any `purchase` row).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_purchased(&self, owner_id: OwnerId) -> Result<bool>;

    /// List ledger rows whose credits have expired as of `now`: rows with a
    /// non-null `expires_at` earlier than `now` whose type is not already
    /// `expiration`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_expired_credits(&self, now: DateTime<Utc>) -> Result<Vec<CreditTransaction>>;

    /// Expire one owner's credits atomically: insert the offsetting row,
    /// flip the original rows' type to `expiration` so future scans skip
    /// them, and apply the offset to the cached balance.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the owner or any original row is missing.
    fn expire_owner_credits(
        &self,
        owner_id: OwnerId,
        original_ids: &[TransactionId],
        offset: &CreditTransaction,
    ) -> Result<i64>;

    // =========================================================================
    // Sent-Email Log
    // =========================================================================

    /// Batch-read the sent-email keys for a set of owners.
    ///
    /// Owners with nothing sent map to an empty set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn sent_email_keys(&self, owner_ids: &[OwnerId]) -> Result<HashMap<OwnerId, HashSet<EmailKey>>>;

    /// Check whether one email key was already sent to an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_sent_email(&self, owner_id: OwnerId, key: EmailKey) -> Result<bool>;

    /// Record that an email key was sent to an owner.
    ///
    /// Called only after delivery reports success, so a failed send is
    /// naturally retried on the next run.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_email_sent(&self, owner_id: OwnerId, key: EmailKey) -> Result<()>;
}
