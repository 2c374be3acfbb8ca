//! HTTP client tests against a mock server.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use covgen_core::{OutboundEmail, OwnerId};
use covgen_jobs::drip::{ActivityFeed, DashboardFeed, SetupPrState};
use covgen_jobs::{
    ChargeOutcome, ChargeRequest, Mailer, PaymentCharger, ResendMailer, SendOutcome, StripeCharger,
};

fn charge_request() -> ChargeRequest {
    ChargeRequest {
        customer_id: "cus_42".to_string(),
        amount_usd: 90,
        description: "Auto-reload: $90 of Covgen credits for acme".to_string(),
        metadata: vec![("kind".to_string(), "auto_reload".to_string())],
    }
}

// ============================================================================
// Stripe
// ============================================================================

#[tokio::test]
async fn stripe_settled_intent_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .and(body_string_contains("amount=9000")) // dollars to cents
        .and(body_string_contains("customer=cus_42"))
        .and(body_string_contains("off_session=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_123",
            "status": "succeeded",
            "amount": 9000,
            "customer": "cus_42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let charger = StripeCharger::with_base_url(server.uri(), "sk_test_xxx");
    let outcome = charger.charge(&charge_request()).await;

    assert_eq!(
        outcome,
        ChargeOutcome::Succeeded {
            payment_intent_id: "pi_123".to_string()
        }
    );
}

#[tokio::test]
async fn stripe_decline_is_a_structured_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
            "error": {
                "type": "card_error",
                "message": "Your card has insufficient funds.",
                "code": "card_declined"
            }
        })))
        .mount(&server)
        .await;

    let charger = StripeCharger::with_base_url(server.uri(), "sk_test_xxx");
    let outcome = charger.charge(&charge_request()).await;

    match outcome {
        ChargeOutcome::Failed { error } => {
            assert!(error.contains("card_error"));
            assert!(error.contains("insufficient funds"));
        }
        ChargeOutcome::Succeeded { .. } => panic!("decline must not succeed"),
    }
}

#[tokio::test]
async fn stripe_unconfirmed_intent_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "pi_456",
            "status": "requires_action",
            "amount": 9000
        })))
        .mount(&server)
        .await;

    let charger = StripeCharger::with_base_url(server.uri(), "sk_test_xxx");
    let outcome = charger.charge(&charge_request()).await;

    match outcome {
        ChargeOutcome::Failed { error } => {
            assert!(error.contains("pi_456"));
            assert!(error.contains("requires_action"));
        }
        ChargeOutcome::Succeeded { .. } => panic!("unsettled intent must not succeed"),
    }
}

#[tokio::test]
async fn stripe_malformed_error_body_reports_the_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/payment_intents"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream blew up"))
        .mount(&server)
        .await;

    let charger = StripeCharger::with_base_url(server.uri(), "sk_test_xxx");
    let outcome = charger.charge(&charge_request()).await;

    match outcome {
        ChargeOutcome::Failed { error } => assert!(error.contains("500")),
        ChargeOutcome::Succeeded { .. } => panic!("500 must not succeed"),
    }
}

// ============================================================================
// Resend
// ============================================================================

fn outbound() -> OutboundEmail {
    OutboundEmail {
        to: "ada@acme.dev".to_string(),
        subject: "Your first coverage report".to_string(),
        text: "Hi Ada, your line coverage sits at 34%.\n\nThe Covgen Team".to_string(),
    }
}

#[tokio::test]
async fn resend_accepted_email_returns_the_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test"))
        .and(body_string_contains("ada@acme.dev"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "4ef0-aaa" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mailer = ResendMailer::with_base_url(server.uri(), "re_test", "Covgen <team@covgen.dev>");
    let outcome = mailer.send(&outbound()).await;

    assert_eq!(
        outcome,
        SendOutcome::Sent {
            email_id: "4ef0-aaa".to_string()
        }
    );
}

#[tokio::test]
async fn resend_rejection_is_a_structured_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "statusCode": 422,
            "message": "Invalid `to` address"
        })))
        .mount(&server)
        .await;

    let mailer = ResendMailer::with_base_url(server.uri(), "re_test", "Covgen <team@covgen.dev>");
    let outcome = mailer.send(&outbound()).await;

    match outcome {
        SendOutcome::Failed { error } => assert!(error.contains("Invalid `to` address")),
        SendOutcome::Sent { .. } => panic!("rejection must not succeed"),
    }
}

// ============================================================================
// Dashboard activity feed
// ============================================================================

#[tokio::test]
async fn dashboard_feed_parses_owner_activity() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/internal/owners/42/activity"))
        .and(header("x-service-key", "svc_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "coverage": { "line_percent": 61, "benchmark_percent": 70 },
            "setup_prs": { "state": "open", "count": 2 },
            "open_test_prs": [
                { "repo": "api", "number": 14, "mergeable": true }
            ],
            "pr_activity": 9,
            "lowest_coverage_repo": "api"
        })))
        .mount(&server)
        .await;

    let feed = DashboardFeed::new(server.uri(), "svc_secret");
    let activity = feed.owner_activity(OwnerId::new(42)).await.unwrap();

    assert_eq!(activity.setup_prs, SetupPrState::Open { count: 2 });
    assert_eq!(activity.coverage.as_ref().unwrap().line_percent, 61);
    assert_eq!(activity.mergeable_test_prs(), 1);
    assert_eq!(activity.lowest_coverage_repo.as_deref(), Some("api"));
}

#[tokio::test]
async fn dashboard_feed_error_status_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = DashboardFeed::new(server.uri(), "svc_secret");
    let err = feed.owner_activity(OwnerId::new(42)).await.unwrap_err();
    assert!(err.to_string().contains("dashboard"));
    assert!(err.to_string().contains("503"));
}
