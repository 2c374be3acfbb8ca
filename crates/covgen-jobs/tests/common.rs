//! Common test utilities for the billing job integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use covgen_core::{Owner, OwnerId, OutboundEmail, Result};
use covgen_jobs::drip::{ActivityFeed, OwnerActivity, SetupPrState};
use covgen_jobs::{Alerter, ChargeOutcome, ChargeRequest, Mailer, PaymentCharger, SendOutcome};
use covgen_store::{RocksStore, Store};

/// Open a fresh store in a temp directory.
pub fn test_store() -> (RocksStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    (store, dir)
}

/// Seed an owner with auto-reload configured and a Stripe customer.
pub fn reload_owner(store: &RocksStore, id: i64, balance: i64, threshold: i64, target: i64) -> Owner {
    let mut owner = Owner::new(OwnerId::new(id), format!("org-{id}"), format!("org-{id}@x.dev"));
    owner.credit_balance_usd = balance;
    owner.auto_reload.enabled = true;
    owner.auto_reload.threshold_usd = threshold;
    owner.auto_reload.target_usd = target;
    owner.stripe_customer_id = Some(format!("cus_{id}"));
    store.put_owner(&owner).unwrap();
    owner
}

/// Seed an installed owner of the given account age in days.
pub fn installed_owner(store: &RocksStore, id: i64, age_days: i64) -> Owner {
    let mut owner = Owner::new(OwnerId::new(id), format!("org-{id}"), format!("org-{id}@x.dev"));
    owner.installed_at = Utc::now() - Duration::days(age_days);
    store.put_owner(&owner).unwrap();
    owner
}

/// Charger whose outcome is scripted per Stripe customer id.
#[derive(Default)]
pub struct FakeCharger {
    outcomes: Mutex<HashMap<String, ChargeOutcome>>,
    pub requests: Mutex<Vec<ChargeRequest>>,
}

impl FakeCharger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, customer_id: &str, error: &str) {
        self.outcomes.lock().unwrap().insert(
            customer_id.to_string(),
            ChargeOutcome::Failed {
                error: error.to_string(),
            },
        );
    }
}

#[async_trait]
impl PaymentCharger for FakeCharger {
    async fn charge(&self, request: &ChargeRequest) -> ChargeOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .get(&request.customer_id)
            .cloned()
            .unwrap_or(ChargeOutcome::Succeeded {
                payment_intent_id: format!("pi_{}", request.customer_id),
            })
    }
}

/// Alerter that records every message.
#[derive(Default)]
pub struct RecordingAlerter {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Alerter for RecordingAlerter {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Mailer that records deliveries and can be told to fail.
#[derive(Default)]
pub struct FakeMailer {
    pub fail: Mutex<bool>,
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl FakeMailer {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutboundEmail) -> SendOutcome {
        if *self.fail.lock().unwrap() {
            return SendOutcome::Failed {
                error: "delivery refused".to_string(),
            };
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        SendOutcome::Sent {
            email_id: format!("em_{}", sent.len()),
        }
    }
}

/// Feed serving scripted activity, with a quiet default.
#[derive(Default)]
pub struct StaticFeed {
    activities: Mutex<HashMap<OwnerId, OwnerActivity>>,
}

impl StaticFeed {
    pub fn set(&self, owner_id: OwnerId, activity: OwnerActivity) {
        self.activities.lock().unwrap().insert(owner_id, activity);
    }
}

#[async_trait]
impl ActivityFeed for StaticFeed {
    async fn owner_activity(&self, owner_id: OwnerId) -> Result<OwnerActivity> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .get(&owner_id)
            .cloned()
            .unwrap_or(OwnerActivity {
                coverage: None,
                setup_prs: SetupPrState::NeverCreated,
                open_test_prs: Vec::new(),
                pr_activity: 0,
                lowest_coverage_repo: None,
            }))
    }
}
