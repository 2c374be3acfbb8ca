//! Lifecycle email types.
//!
//! `EmailKey` is the symbolic identity of each lifecycle email; the
//! sent-email log is keyed by `(owner, key)` and a key is sent at most
//! once per owner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbolic key of a lifecycle email slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKey {
    /// Onboarding: review or create the setup pull requests.
    ReviewSetupPr,

    /// Onboarding: first coverage report.
    CoverageCharts,

    /// Onboarding: recommend a target branch and schedule.
    SetTargetBranch,

    /// Onboarding: nudge to merge open generated test PRs.
    MergeTestPr,

    /// Onboarding: purchase credits.
    PurchaseCredits,

    /// One-shot reintroduction for dormant accounts.
    DormantReintro,

    /// Milestone: coverage crossed 50%.
    #[serde(rename = "owner_coverage_50")]
    Coverage50,

    /// Milestone: coverage crossed 80%.
    #[serde(rename = "owner_coverage_80")]
    Coverage80,

    /// Milestone: coverage crossed 90%.
    #[serde(rename = "owner_coverage_90")]
    Coverage90,
}

impl EmailKey {
    /// Stable wire name, used as the sent-log key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReviewSetupPr => "review_setup_pr",
            Self::CoverageCharts => "coverage_charts",
            Self::SetTargetBranch => "set_target_branch",
            Self::MergeTestPr => "merge_test_pr",
            Self::PurchaseCredits => "purchase_credits",
            Self::DormantReintro => "dormant_reintro",
            Self::Coverage50 => "owner_coverage_50",
            Self::Coverage80 => "owner_coverage_80",
            Self::Coverage90 => "owner_coverage_90",
        }
    }

    /// All keys, for batch reads of the sent log.
    #[must_use]
    pub const fn all() -> [Self; 9] {
        [
            Self::ReviewSetupPr,
            Self::CoverageCharts,
            Self::SetTargetBranch,
            Self::MergeTestPr,
            Self::PurchaseCredits,
            Self::DormantReintro,
            Self::Coverage50,
            Self::Coverage80,
            Self::Coverage90,
        ]
    }
}

impl fmt::Display for EmailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailKey {
    type Err = UnknownEmailKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownEmailKey(s.to_string()))
    }
}

/// Error returned when decoding an unknown sent-log key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown email key: {0}")]
pub struct UnknownEmailKey(pub String);

/// Rendered subject and body of one lifecycle email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    /// Subject line.
    pub subject: String,

    /// Plain-text body, signature line included.
    pub body: String,
}

/// A fully addressed email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    pub text: String,
}
