//! Core types for Covgen billing.
//!
//! This crate provides the foundational types used by the billing jobs:
//!
//! - **Identifiers**: `OwnerId`, `TransactionId`
//! - **Owners**: `Owner`, `Subscription`, `AutoReload`
//! - **Ledger**: `CreditTransaction`, `TransactionType`
//! - **Emails**: `EmailKey`, `EmailContent`, `OutboundEmail`
//!
//! # Credit unit
//!
//! **1 credit = $1 (one whole US dollar)**
//!
//! Amounts are stored as `i64` whole dollars everywhere; no fractional-cent
//! handling exists in this core. An owner's cached balance is derived from
//! the ledger: the sum of all transaction amounts for an owner equals the
//! cached balance, and every balance-affecting write goes through a single
//! atomic store operation to keep the two consistent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod email;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod owner;

pub use email::{EmailContent, EmailKey, OutboundEmail};
pub use error::{BillingError, Result};
pub use ids::{IdError, OwnerId, TransactionId};
pub use ledger::{CreditTransaction, TransactionType};
pub use owner::{
    AutoReload, Owner, Subscription, SubscriptionStatus, DEFAULT_RELOAD_TARGET_USD,
    DEFAULT_RELOAD_THRESHOLD_USD,
};
