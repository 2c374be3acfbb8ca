//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary owner records, keyed by big-endian `owner_id`.
    pub const OWNERS: &str = "owners";

    /// Ledger rows, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: ledger rows by owner, keyed by `owner_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_OWNER: &str = "transactions_by_owner";

    /// Sent-email log, keyed by `owner_id || email_key`. Value is the
    /// RFC 3339 send timestamp.
    pub const SENT_EMAILS: &str = "sent_emails";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::OWNERS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_OWNER,
        cf::SENT_EMAILS,
    ]
}
