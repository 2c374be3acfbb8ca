//! The drip decision engine.
//!
//! `decide` is pure: snapshot in, decision out. Three tracks, evaluated in
//! order, at most one email per owner per run:
//!
//! 1. **Dormancy**: old accounts with zero product PR activity get one
//!    `dormant_reintro`; once it has been sent, onboarding is over for
//!    that owner.
//! 2. **Onboarding**: an ordered walk of day-gated slots. A slot predicate
//!    answers with a tagged [`SlotOutcome`]: `Send` fires the slot,
//!    `SkipForward` collapses the schedule forward (the successor slot
//!    becomes due at the same logical day), `Pause` blocks the owner's
//!    walk until missing data appears. Already-sent slots are stepped
//!    over without opening the day gate.
//! 3. **Milestones**: coverage-band emails, evaluated only when the other
//!    tracks produced nothing this run.

use covgen_core::{EmailContent, EmailKey};
use serde::Serialize;

use super::context::{OwnerDripContext, SetupPrState};
use super::templates;

/// Days of zero PR activity after which an account counts as dormant.
pub const DORMANT_AFTER_DAYS: i64 = 21;

/// What a slot predicate says about its owner this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// The slot applies; send this content.
    Send(EmailContent),

    /// The slot is already satisfied; move to the next slot at the same
    /// logical day.
    SkipForward,

    /// The slot is blocked on missing data; stop evaluating this owner
    /// until the data appears.
    Pause,
}

/// The engine's verdict for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DripDecision {
    /// Send exactly this email and record `key` on success.
    Send {
        /// The slot being sent.
        key: EmailKey,
        /// Rendered content.
        email: EmailContent,
    },

    /// Nothing to send this run.
    NoOp {
        /// Why nothing was sent.
        reason: NoOpReason,
    },
}

/// Why an owner got no email this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Dormant owner, reintro already sent.
    Dormant,

    /// The next unsent slot's day threshold has not arrived.
    NotDueYet,

    /// A slot is blocked on missing data (e.g. no coverage yet).
    PausedAwaitingData,

    /// Every onboarding slot is sent or skipped and no milestone fired.
    Exhausted,
}

/// One onboarding slot: a day gate plus a predicate.
struct Slot {
    key: EmailKey,
    min_day: i64,
    eval: fn(&OwnerDripContext) -> SlotOutcome,
}

const SLOTS: [Slot; 5] = [
    Slot {
        key: EmailKey::ReviewSetupPr,
        min_day: 1,
        eval: eval_review_setup_pr,
    },
    Slot {
        key: EmailKey::CoverageCharts,
        min_day: 2,
        eval: eval_coverage_charts,
    },
    Slot {
        key: EmailKey::SetTargetBranch,
        min_day: 3,
        eval: eval_set_target_branch,
    },
    Slot {
        key: EmailKey::MergeTestPr,
        min_day: 5,
        eval: eval_merge_test_pr,
    },
    Slot {
        key: EmailKey::PurchaseCredits,
        min_day: 7,
        eval: eval_purchase_credits,
    },
];

/// Decide what, if anything, to send this owner this run.
#[must_use]
pub fn decide(ctx: &OwnerDripContext) -> DripDecision {
    // Dormancy short-circuits onboarding entirely.
    if ctx.account_age_days >= DORMANT_AFTER_DAYS && ctx.activity.pr_activity == 0 {
        if ctx.sent.contains(&EmailKey::DormantReintro) {
            return milestone_or(ctx, NoOpReason::Dormant);
        }
        return DripDecision::Send {
            key: EmailKey::DormantReintro,
            email: templates::dormant_reintro(ctx),
        };
    }

    match walk_onboarding(ctx) {
        Walk::Send(key, email) => DripDecision::Send { key, email },
        Walk::NotDue => milestone_or(ctx, NoOpReason::NotDueYet),
        Walk::Paused => milestone_or(ctx, NoOpReason::PausedAwaitingData),
        Walk::Exhausted => milestone_or(ctx, NoOpReason::Exhausted),
    }
}

enum Walk {
    Send(EmailKey, EmailContent),
    NotDue,
    Paused,
    Exhausted,
}

fn walk_onboarding(ctx: &OwnerDripContext) -> Walk {
    // Opened when a due slot skips forward; its successor is then due at
    // the same logical day. Sent slots consumed their day and do not open
    // the gate.
    let mut gate_open = false;

    for slot in &SLOTS {
        if ctx.sent.contains(&slot.key) {
            gate_open = false;
            continue;
        }

        if !gate_open && ctx.account_age_days < slot.min_day {
            return Walk::NotDue;
        }

        match (slot.eval)(ctx) {
            SlotOutcome::SkipForward => {
                gate_open = true;
            }
            SlotOutcome::Pause => return Walk::Paused,
            SlotOutcome::Send(email) => return Walk::Send(slot.key, email),
        }
    }

    Walk::Exhausted
}

/// Milestone track: fires only when nothing else did this run.
fn milestone_or(ctx: &OwnerDripContext, reason: NoOpReason) -> DripDecision {
    match milestone(ctx) {
        Some((key, email)) => DripDecision::Send { key, email },
        None => DripDecision::NoOp { reason },
    }
}

/// Coverage bands, highest first. An owner sits in exactly one band and
/// lower bands are not back-filled after a jump.
const MILESTONE_BANDS: [(u8, EmailKey); 3] = [
    (90, EmailKey::Coverage90),
    (80, EmailKey::Coverage80),
    (50, EmailKey::Coverage50),
];

fn milestone(ctx: &OwnerDripContext) -> Option<(EmailKey, EmailContent)> {
    let coverage = ctx.activity.coverage.as_ref()?;

    let (band, key) = MILESTONE_BANDS
        .into_iter()
        .find(|(band, _)| coverage.line_percent >= *band)?;

    if ctx.sent.contains(&key) {
        return None;
    }

    Some((key, templates::coverage_milestone(ctx, band)))
}

// ============================================================================
// Slot predicates
// ============================================================================

fn eval_review_setup_pr(ctx: &OwnerDripContext) -> SlotOutcome {
    match ctx.activity.setup_prs {
        SetupPrState::Open { .. } => SlotOutcome::Send(templates::review_setup_pr_open(ctx)),
        SetupPrState::NeverCreated => SlotOutcome::Send(templates::review_setup_pr_missing(ctx)),
        SetupPrState::AllMerged => SlotOutcome::SkipForward,
    }
}

fn eval_coverage_charts(ctx: &OwnerDripContext) -> SlotOutcome {
    if ctx.activity.coverage.is_some() {
        SlotOutcome::Send(templates::coverage_charts(ctx))
    } else {
        // No coverage yet: block rather than skip, the report will exist
        // eventually.
        SlotOutcome::Pause
    }
}

fn eval_set_target_branch(ctx: &OwnerDripContext) -> SlotOutcome {
    SlotOutcome::Send(templates::set_target_branch(ctx))
}

fn eval_merge_test_pr(ctx: &OwnerDripContext) -> SlotOutcome {
    if ctx.activity.mergeable_test_prs() > 0 {
        SlotOutcome::Send(templates::merge_test_pr(ctx))
    } else {
        SlotOutcome::SkipForward
    }
}

fn eval_purchase_credits(ctx: &OwnerDripContext) -> SlotOutcome {
    // Subscribers are exempt from credit nagging even at $0 balance.
    if ctx.has_active_subscription {
        SlotOutcome::SkipForward
    } else {
        SlotOutcome::Send(templates::purchase_credits(ctx))
    }
}
