//! Auto-reload sweep integration tests.

mod common;

use common::{reload_owner, test_store, FakeCharger, RecordingAlerter};

use covgen_core::{CreditTransaction, Owner, OwnerId, TransactionType};
use covgen_jobs::{run_auto_reload_sweep, ReloadOutcome};
use covgen_store::Store;

// ============================================================================
// Eligibility
// ============================================================================

#[tokio::test]
async fn owners_above_threshold_are_excluded() {
    let (store, _dir) = test_store();
    reload_owner(&store, 1, 80, 20, 100); // balance > threshold

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.processed, 0);
    assert!(report.results.is_empty());
    assert!(charger.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_or_cardless_owners_are_excluded() {
    let (store, _dir) = test_store();

    let mut disabled = Owner::new(OwnerId::new(1), "disabled", "a@x.dev");
    disabled.auto_reload.threshold_usd = 20;
    disabled.stripe_customer_id = Some("cus_1".into());
    store.put_owner(&disabled).unwrap();

    let mut cardless = Owner::new(OwnerId::new(2), "cardless", "b@x.dev");
    cardless.auto_reload.enabled = true;
    cardless.auto_reload.threshold_usd = 20;
    store.put_owner(&cardless).unwrap();

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn threshold_gate_is_inclusive() {
    let (store, _dir) = test_store();
    reload_owner(&store, 1, 20, 20, 100); // balance == threshold

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert!(matches!(
        report.results[0].outcome,
        ReloadOutcome::Charged { amount_usd: 80, .. }
    ));
}

// ============================================================================
// Charging
// ============================================================================

#[tokio::test]
async fn successful_charge_is_recorded_in_the_ledger() {
    let (store, _dir) = test_store();
    let owner = reload_owner(&store, 1, 10, 20, 100);

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.charged(), 1);
    match &report.results[0].outcome {
        ReloadOutcome::Charged {
            amount_usd,
            payment_intent_id,
        } => {
            assert_eq!(*amount_usd, 90);
            assert_eq!(payment_intent_id, "pi_cus_1");
        }
        other => panic!("expected a charge, got {other:?}"),
    }

    // The ledger row and balance moved together.
    let reloaded = store.get_owner(owner.id).unwrap().unwrap();
    assert_eq!(reloaded.credit_balance_usd, 100);
    let transactions = store.list_transactions_by_owner(owner.id, 10, 0).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].transaction_type, TransactionType::AutoReload);
    assert_eq!(transactions[0].amount_usd, 90);
    assert_eq!(
        transactions[0].stripe_payment_intent_id.as_deref(),
        Some("pi_cus_1")
    );

    // Post-charge the balance is above the threshold: a second sweep is a
    // no-op, which is what makes a killed sweep safe to rerun.
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn charge_request_carries_description_and_reload_metadata() {
    let (store, _dir) = test_store();
    reload_owner(&store, 1, 10, 20, 100);

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    let requests = charger.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.amount_usd, 90);
    assert!(request.description.contains("org-1"));
    assert!(request
        .metadata
        .iter()
        .any(|(k, v)| k == "kind" && v == "auto_reload"));
    assert!(request
        .metadata
        .iter()
        .any(|(k, v)| k == "trigger_balance_usd" && v == "10"));
    assert!(request
        .metadata
        .iter()
        .any(|(k, v)| k == "target_usd" && v == "100"));
}

#[tokio::test]
async fn met_target_is_skipped_with_the_exact_reason() {
    let (store, _dir) = test_store();
    // Balance below threshold but at the target: nothing to purchase.
    reload_owner(&store, 1, 20, 20, 20);

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(
        report.results[0].outcome,
        ReloadOutcome::Skipped {
            reason: "Target amount would be negative or zero".to_string()
        }
    );
    assert!(charger.requests.lock().unwrap().is_empty());
}

// ============================================================================
// Spending limits
// ============================================================================

#[tokio::test]
async fn near_limit_charge_is_clamped_to_the_headroom() {
    let (store, _dir) = test_store();
    let mut owner = reload_owner(&store, 1, 0, 50, 150);
    owner.max_monthly_spend_usd = Some(5000);
    store.put_owner(&owner).unwrap();

    // $4980 of purchases this month, then usage bringing the balance back
    // under the threshold (usage never counts toward the cap).
    store
        .apply_transaction(&CreditTransaction::purchase(owner.id, 4980, None, None))
        .unwrap();
    store
        .apply_transaction(&CreditTransaction::usage(owner.id, 4960, 1))
        .unwrap();

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert!(matches!(
        report.results[0].outcome,
        ReloadOutcome::Charged { amount_usd: 20, .. }
    ));
}

#[tokio::test]
async fn reached_limit_skips_the_owner() {
    let (store, _dir) = test_store();
    let mut owner = reload_owner(&store, 1, 0, 50, 150);
    owner.max_monthly_spend_usd = Some(100);
    store.put_owner(&owner).unwrap();

    store
        .apply_transaction(&CreditTransaction::purchase(owner.id, 100, None, None))
        .unwrap();
    store
        .apply_transaction(&CreditTransaction::usage(owner.id, 90, 1))
        .unwrap();

    let charger = FakeCharger::new();
    let alerter = RecordingAlerter::default();
    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(
        report.results[0].outcome,
        ReloadOutcome::Skipped {
            reason: "Monthly spending limit already reached".to_string()
        }
    );
    assert!(charger.requests.lock().unwrap().is_empty());
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn one_declined_card_alerts_and_does_not_abort_the_sweep() {
    let (store, _dir) = test_store();
    reload_owner(&store, 1, 10, 20, 100);
    reload_owner(&store, 2, 5, 20, 100);

    let charger = FakeCharger::new();
    charger.fail_for("cus_1", "card_declined: insufficient funds");
    let alerter = RecordingAlerter::default();

    let report = run_auto_reload_sweep(&store, &charger, &alerter)
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.charged(), 1);

    let failed = report
        .results
        .iter()
        .find(|r| r.owner_id == OwnerId::new(1))
        .unwrap();
    assert!(matches!(
        &failed.outcome,
        ReloadOutcome::Failed { error } if error.contains("card_declined")
    ));

    // The failed owner's balance is untouched.
    assert_eq!(
        store
            .get_owner(OwnerId::new(1))
            .unwrap()
            .unwrap()
            .credit_balance_usd,
        10
    );

    let messages = alerter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("owner 1"));
    assert!(messages[0].contains("$90"));
    assert!(messages[0].contains("card_declined"));
}
