//! Key encoding utilities for `RocksDB`.
//!
//! Owner ids are encoded big-endian so lexicographic key order matches
//! numeric order; ULID transaction ids are naturally time-ordered, so the
//! composite index keys sort chronologically within an owner.

use covgen_core::{EmailKey, OwnerId, TransactionId};

/// Create an owner key from an owner id.
#[must_use]
pub fn owner_key(owner_id: OwnerId) -> Vec<u8> {
    owner_id.to_be_bytes().to_vec()
}

/// Create a transaction key from a transaction id.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create an owner-transaction index key.
///
/// Format: `owner_id (8 bytes) || transaction_id (16 bytes)`
#[must_use]
pub fn owner_transaction_key(owner_id: OwnerId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&owner_id.to_be_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all transactions for an owner.
#[must_use]
pub fn owner_transactions_prefix(owner_id: OwnerId) -> Vec<u8> {
    owner_id.to_be_bytes().to_vec()
}

/// Extract the transaction id from an owner-transaction index key.
///
/// Returns `None` if the key is too short or malformed.
#[must_use]
pub fn extract_transaction_id_from_owner_key(key: &[u8]) -> Option<TransactionId> {
    let tail: [u8; 16] = key.get(8..24)?.try_into().ok()?;
    TransactionId::from_bytes(tail).ok()
}

/// Create a sent-email log key.
///
/// Format: `owner_id (8 bytes) || email_key (utf-8)`
#[must_use]
pub fn sent_email_key(owner_id: OwnerId, key: EmailKey) -> Vec<u8> {
    let name = key.as_str().as_bytes();
    let mut out = Vec::with_capacity(8 + name.len());
    out.extend_from_slice(&owner_id.to_be_bytes());
    out.extend_from_slice(name);
    out
}

/// Create a prefix for iterating one owner's sent-email log.
#[must_use]
pub fn owner_sent_prefix(owner_id: OwnerId) -> Vec<u8> {
    owner_id.to_be_bytes().to_vec()
}

/// Extract the email key from a sent-email log key.
///
/// Returns `None` for malformed or unknown keys (e.g. keys written by a
/// newer version with more email slots).
#[must_use]
pub fn extract_email_key_from_sent_key(key: &[u8]) -> Option<EmailKey> {
    let name = std::str::from_utf8(key.get(8..)?).ok()?;
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_transaction_key_roundtrip() {
        let owner = OwnerId::new(77);
        let tx = TransactionId::generate();
        let key = owner_transaction_key(owner, &tx);

        assert_eq!(key.len(), 24);
        assert!(key.starts_with(&owner_transactions_prefix(owner)));
        assert_eq!(extract_transaction_id_from_owner_key(&key), Some(tx));
    }

    #[test]
    fn sent_email_key_roundtrip() {
        let owner = OwnerId::new(77);
        let key = sent_email_key(owner, EmailKey::CoverageCharts);

        assert!(key.starts_with(&owner_sent_prefix(owner)));
        assert_eq!(
            extract_email_key_from_sent_key(&key),
            Some(EmailKey::CoverageCharts)
        );
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(extract_transaction_id_from_owner_key(&[0u8; 10]), None);
        assert_eq!(extract_email_key_from_sent_key(&[0u8; 4]), None);

        let mut unknown = OwnerId::new(1).to_be_bytes().to_vec();
        unknown.extend_from_slice(b"not_a_real_key");
        assert_eq!(extract_email_key_from_sent_key(&unknown), None);
    }
}
