//! Per-owner drip snapshot and the activity feed that supplies it.
//!
//! The decision engine consumes an immutable [`OwnerDripContext`] built
//! fresh on every run; nothing about an owner's "current drip state" is
//! persisted beyond the sent-email log.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use covgen_core::{BillingError, EmailKey, Owner, OwnerId, Result};

/// Coverage figures for one owner, aggregated across repos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    /// Line coverage as a whole percentage (0-100).
    pub line_percent: u8,

    /// Benchmark percentage for comparable teams, when available.
    #[serde(default)]
    pub benchmark_percent: Option<u8>,
}

/// State of the owner's setup pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SetupPrState {
    /// No setup PR was ever created.
    NeverCreated,

    /// At least one setup PR is open and unmerged.
    Open {
        /// Number of open setup PRs.
        count: u32,
    },

    /// Setup PRs exist and all of them are merged.
    AllMerged,
}

/// A product-created test pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPr {
    /// Repository name.
    pub repo: String,

    /// Pull request number.
    pub number: u64,

    /// Whether checks pass and the PR is mergeable.
    pub mergeable: bool,
}

/// The product-side half of an owner's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerActivity {
    /// Coverage figures, once the first report exists.
    #[serde(default)]
    pub coverage: Option<CoverageSnapshot>,

    /// Setup PR state.
    pub setup_prs: SetupPrState,

    /// Open product-created test PRs.
    #[serde(default)]
    pub open_test_prs: Vec<TestPr>,

    /// Count of product-created PRs over the account lifetime.
    #[serde(default)]
    pub pr_activity: u32,

    /// The repo most in need of coverage, for the target-branch nudge.
    #[serde(default)]
    pub lowest_coverage_repo: Option<String>,
}

impl OwnerActivity {
    /// Number of open test PRs that are green and mergeable.
    #[must_use]
    pub fn mergeable_test_prs(&self) -> usize {
        self.open_test_prs.iter().filter(|pr| pr.mergeable).count()
    }
}

/// Immutable per-owner snapshot consumed by the decision engine.
#[derive(Debug, Clone)]
pub struct OwnerDripContext {
    /// The owner.
    pub owner_id: OwnerId,

    /// Account login name.
    pub owner_name: String,

    /// Greeting name.
    pub first_name: String,

    /// Address to deliver to.
    pub billing_email: String,

    /// Whole days since the product was installed.
    pub account_age_days: i64,

    /// Cached credit balance in whole dollars.
    pub balance_usd: i64,

    /// Whether the owner has ever purchased credits.
    pub has_purchased: bool,

    /// Whether the owner has an active paid subscription.
    pub has_active_subscription: bool,

    /// Product-side activity.
    pub activity: OwnerActivity,

    /// Email keys already sent to this owner.
    pub sent: HashSet<EmailKey>,
}

impl OwnerDripContext {
    /// Assemble a snapshot from its sources.
    #[must_use]
    pub fn assemble(
        owner: &Owner,
        activity: OwnerActivity,
        sent: HashSet<EmailKey>,
        has_purchased: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            owner_id: owner.id,
            owner_name: owner.name.clone(),
            first_name: owner.first_name().to_string(),
            billing_email: owner.billing_email.clone(),
            account_age_days: owner.account_age_days(now),
            balance_usd: owner.credit_balance_usd,
            has_purchased,
            has_active_subscription: owner.has_active_subscription(),
            activity,
            sent,
        }
    }
}

/// Supplies the product-side half of owner snapshots.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Load one owner's activity.
    async fn owner_activity(&self, owner_id: OwnerId) -> Result<OwnerActivity>;
}

/// Activity feed backed by the dashboard's internal API.
#[derive(Debug, Clone)]
pub struct DashboardFeed {
    client: Client,
    base_url: String,
    service_api_key: String,
}

impl DashboardFeed {
    /// Create a new feed client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Dashboard base URL
    /// * `service_api_key` - Service-to-service API key
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(base_url: impl Into<String>, service_api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_api_key: service_api_key.into(),
        }
    }
}

#[async_trait]
impl ActivityFeed for DashboardFeed {
    async fn owner_activity(&self, owner_id: OwnerId) -> Result<OwnerActivity> {
        let url = format!("{}/internal/owners/{owner_id}/activity", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-service-key", &self.service_api_key)
            .send()
            .await
            .map_err(|e| BillingError::ExternalService {
                service: "dashboard".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BillingError::ExternalService {
                service: "dashboard".to_string(),
                message: format!("HTTP {status}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| BillingError::ExternalService {
                service: "dashboard".to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mergeable_count_ignores_red_prs() {
        let activity = OwnerActivity {
            coverage: None,
            setup_prs: SetupPrState::AllMerged,
            open_test_prs: vec![
                TestPr {
                    repo: "api".into(),
                    number: 12,
                    mergeable: true,
                },
                TestPr {
                    repo: "web".into(),
                    number: 9,
                    mergeable: false,
                },
            ],
            pr_activity: 4,
            lowest_coverage_repo: None,
        };
        assert_eq!(activity.mergeable_test_prs(), 1);
    }

    #[test]
    fn activity_deserializes_with_defaults() {
        let activity: OwnerActivity =
            serde_json::from_str(r#"{"setup_prs":{"state":"never_created"}}"#).unwrap();
        assert_eq!(activity.setup_prs, SetupPrState::NeverCreated);
        assert!(activity.coverage.is_none());
        assert!(activity.open_test_prs.is_empty());
        assert_eq!(activity.pr_activity, 0);
    }
}
