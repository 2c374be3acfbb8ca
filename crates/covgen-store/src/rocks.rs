//! `RocksDB` storage implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use covgen_core::{CreditTransaction, EmailKey, Owner, OwnerId, TransactionId, TransactionType};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Iterate all owner records, keeping those matching `filter`.
    fn scan_owners<F: Fn(&Owner) -> bool>(&self, filter: F) -> Result<Vec<Owner>> {
        let cf = self.cf(cf::OWNERS)?;
        let mut owners = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let owner: Owner = Self::deserialize(&value)?;
            if filter(&owner) {
                owners.push(owner);
            }
        }

        Ok(owners)
    }

    /// Collect one owner's ledger rows, oldest first.
    fn owner_transactions(&self, owner_id: OwnerId) -> Result<Vec<CreditTransaction>> {
        let cf_by_owner = self.cf(cf::TRANSACTIONS_BY_OWNER)?;
        let prefix = keys::owner_transactions_prefix(owner_id);

        let mut transactions = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_owner,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let Some(tx_id) = keys::extract_transaction_id_from_owner_key(&key) else {
                tracing::warn!(owner_id = %owner_id, "Skipping malformed index key");
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Owner Operations
    // =========================================================================

    fn put_owner(&self, owner: &Owner) -> Result<()> {
        let cf = self.cf(cf::OWNERS)?;
        let key = keys::owner_key(owner.id);
        let value = Self::serialize(owner)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_owner(&self, owner_id: OwnerId) -> Result<Option<Owner>> {
        let cf = self.cf(cf::OWNERS)?;
        let key = keys::owner_key(owner_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_auto_reload_owners(&self) -> Result<Vec<Owner>> {
        self.scan_owners(Owner::auto_reload_configured)
    }

    fn list_installed_owners(&self) -> Result<Vec<Owner>> {
        self.scan_owners(|owner| owner.active_installations > 0)
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn apply_transaction(&self, transaction: &CreditTransaction) -> Result<i64> {
        let mut owner = self
            .get_owner(transaction.owner_id)?
            .ok_or(StoreError::NotFound)?;

        owner.credit_balance_usd += transaction.amount_usd;
        owner.updated_at = Utc::now();

        let cf_owners = self.cf(cf::OWNERS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_owner = self.cf(cf::TRANSACTIONS_BY_OWNER)?;

        let owner_key = keys::owner_key(owner.id);
        let tx_key = keys::transaction_key(&transaction.id);
        let owner_tx_key = keys::owner_transaction_key(owner.id, &transaction.id);

        let owner_value = Self::serialize(&owner)?;
        let tx_value = Self::serialize(transaction)?;

        // Ledger row and recomputed balance land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_owners, &owner_key, &owner_value);
        batch.put_cf(&cf_tx, &tx_key, &tx_value);
        batch.put_cf(&cf_by_owner, &owner_tx_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(owner.credit_balance_usd)
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_transactions_by_owner(
        &self,
        owner_id: OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let mut transactions = self.owner_transactions(owner_id)?;

        // ULID keys are oldest-first; present newest-first.
        transactions.reverse();

        Ok(transactions.into_iter().skip(offset).take(limit).collect())
    }

    fn monthly_limited_inflow(&self, owner_id: OwnerId, since: DateTime<Utc>) -> Result<i64> {
        let total = self
            .owner_transactions(owner_id)?
            .iter()
            .filter(|tx| {
                tx.created_at >= since
                    && tx.transaction_type.counts_toward_spending_limit()
                    && tx.amount_usd > 0
            })
            .map(|tx| tx.amount_usd)
            .sum();

        Ok(total)
    }

    fn has_purchased(&self, owner_id: OwnerId) -> Result<bool> {
        let purchased = self
            .owner_transactions(owner_id)?
            .iter()
            .any(|tx| tx.transaction_type == TransactionType::Purchase);

        Ok(purchased)
    }

    fn list_expired_credits(&self, now: DateTime<Utc>) -> Result<Vec<CreditTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let mut expired = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let tx: CreditTransaction = Self::deserialize(&value)?;
            if tx.expired_as_of(now) {
                expired.push(tx);
            }
        }

        Ok(expired)
    }

    fn expire_owner_credits(
        &self,
        owner_id: OwnerId,
        original_ids: &[TransactionId],
        offset: &CreditTransaction,
    ) -> Result<i64> {
        let mut owner = self.get_owner(owner_id)?.ok_or(StoreError::NotFound)?;

        let cf_owners = self.cf(cf::OWNERS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_owner = self.cf(cf::TRANSACTIONS_BY_OWNER)?;

        let mut batch = WriteBatch::default();

        // Flip the processed originals so future expiry scans skip them.
        for tx_id in original_ids {
            let mut original = self.get_transaction(tx_id)?.ok_or(StoreError::NotFound)?;
            original.transaction_type = TransactionType::Expiration;
            let value = Self::serialize(&original)?;
            batch.put_cf(&cf_tx, keys::transaction_key(tx_id), &value);
        }

        owner.credit_balance_usd += offset.amount_usd;
        owner.updated_at = Utc::now();

        let owner_value = Self::serialize(&owner)?;
        let offset_value = Self::serialize(offset)?;

        batch.put_cf(&cf_owners, keys::owner_key(owner_id), &owner_value);
        batch.put_cf(&cf_tx, keys::transaction_key(&offset.id), &offset_value);
        batch.put_cf(
            &cf_by_owner,
            keys::owner_transaction_key(owner_id, &offset.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(owner.credit_balance_usd)
    }

    // =========================================================================
    // Sent-Email Log
    // =========================================================================

    fn sent_email_keys(&self, owner_ids: &[OwnerId]) -> Result<HashMap<OwnerId, HashSet<EmailKey>>> {
        let cf = self.cf(cf::SENT_EMAILS)?;
        let mut sent = HashMap::with_capacity(owner_ids.len());

        for &owner_id in owner_ids {
            let prefix = keys::owner_sent_prefix(owner_id);
            let mut keys_for_owner = HashSet::new();

            let iter = self.db.iterator_cf(
                &cf,
                IteratorMode::From(&prefix, rocksdb::Direction::Forward),
            );

            for item in iter {
                let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

                if !key.starts_with(&prefix) {
                    break;
                }

                // Unknown key names (written by a newer schema) are skipped.
                if let Some(email_key) = keys::extract_email_key_from_sent_key(&key) {
                    keys_for_owner.insert(email_key);
                }
            }

            sent.insert(owner_id, keys_for_owner);
        }

        Ok(sent)
    }

    fn has_sent_email(&self, owner_id: OwnerId, key: EmailKey) -> Result<bool> {
        let cf = self.cf(cf::SENT_EMAILS)?;
        let exists = self
            .db
            .get_cf(&cf, keys::sent_email_key(owner_id, key))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    fn record_email_sent(&self, owner_id: OwnerId, key: EmailKey) -> Result<()> {
        let cf = self.cf(cf::SENT_EMAILS)?;
        let sent_at = Utc::now().to_rfc3339();

        self.db
            .put_cf(&cf, keys::sent_email_key(owner_id, key), sent_at.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}
