//! Lifecycle email templates.
//!
//! Every template is a pure function from the owner snapshot to a subject
//! and a short plain-text body. Bodies carry a hard 250-character budget
//! (enforced by tests against worst-case-length inputs, not here) and all
//! of them close with [`SIGNATURE`]. Repo names can be long, so they are
//! clipped before interpolation; greeting names are short by construction
//! (account logins cap at 39 characters).

use covgen_core::EmailContent;

use super::context::{OwnerDripContext, SetupPrState};

/// Closing line appended to every body.
pub const SIGNATURE: &str = "\n\nThe Covgen Team";

/// Longest repo name a body will interpolate.
const MAX_REPO_CHARS: usize = 28;

/// Clip a name to `max` characters, marking the cut.
fn clip(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut out: String = name.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// `review_setup_pr`, variant for open unmerged setup PRs.
#[must_use]
pub fn review_setup_pr_open(ctx: &OwnerDripContext) -> EmailContent {
    let count = match ctx.activity.setup_prs {
        SetupPrState::Open { count } => count,
        SetupPrState::NeverCreated | SetupPrState::AllMerged => 0,
    };
    let noun = if count == 1 { "PR is" } else { "PRs are" };
    EmailContent {
        subject: "Your Covgen setup PRs are waiting".to_string(),
        body: format!(
            "Hi {}, your Covgen setup {noun} still open. Merging lets us start \
             generating tests for your repos.{SIGNATURE}",
            ctx.first_name,
        ),
    }
}

/// `review_setup_pr`, variant for owners who never created a setup PR.
#[must_use]
pub fn review_setup_pr_missing(ctx: &OwnerDripContext) -> EmailContent {
    EmailContent {
        subject: "Finish setting up Covgen".to_string(),
        body: format!(
            "Hi {}, Covgen is installed but has no setup PR yet. Head to your \
             dashboard to create one and we will take it from there.{SIGNATURE}",
            ctx.first_name,
        ),
    }
}

/// `coverage_charts`: the first coverage report.
#[must_use]
pub fn coverage_charts(ctx: &OwnerDripContext) -> EmailContent {
    let body = match &ctx.activity.coverage {
        Some(cov) => match cov.benchmark_percent {
            Some(bench) => format!(
                "Hi {}, your line coverage sits at {}%. Teams your size average \
                 {bench}%. The full chart is on your dashboard.{SIGNATURE}",
                ctx.first_name, cov.line_percent,
            ),
            None => format!(
                "Hi {}, your line coverage sits at {}%. The full chart is on \
                 your dashboard.{SIGNATURE}",
                ctx.first_name, cov.line_percent,
            ),
        },
        // The slot pauses without coverage; this arm is unreachable in the
        // engine but keeps the template total.
        None => format!(
            "Hi {}, your first coverage chart is on your dashboard.{SIGNATURE}",
            ctx.first_name,
        ),
    };
    EmailContent {
        subject: "Your first coverage report".to_string(),
        body,
    }
}

/// `set_target_branch`: recommend a target branch and schedule.
#[must_use]
pub fn set_target_branch(ctx: &OwnerDripContext) -> EmailContent {
    let body = match &ctx.activity.lowest_coverage_repo {
        Some(repo) => format!(
            "Hi {}, pick a target branch and a schedule so Covgen can keep \
             coverage up on its own. Start with {}.{SIGNATURE}",
            ctx.first_name,
            clip(repo, MAX_REPO_CHARS),
        ),
        None => format!(
            "Hi {}, pick a target branch and a schedule so Covgen can keep \
             coverage up on its own. Your dashboard suggests where to start.{SIGNATURE}",
            ctx.first_name,
        ),
    };
    EmailContent {
        subject: "Put Covgen on a schedule".to_string(),
        body,
    }
}

/// `merge_test_pr`: nudge about green generated PRs. The engine only fires
/// this with a non-empty mergeable list.
#[must_use]
pub fn merge_test_pr(ctx: &OwnerDripContext) -> EmailContent {
    let count = ctx.activity.mergeable_test_prs();
    let noun = if count == 1 { "PR is" } else { "PRs are" };
    EmailContent {
        subject: "Test PRs ready to merge".to_string(),
        body: format!(
            "Hi {}, {count} Covgen test {noun} green and ready to merge. \
             Landing them locks in the coverage they add.{SIGNATURE}",
            ctx.first_name,
        ),
    }
}

/// `purchase_credits`: tailored by purchase history and balance.
#[must_use]
pub fn purchase_credits(ctx: &OwnerDripContext) -> EmailContent {
    let body = if ctx.has_purchased {
        format!(
            "Hi {}, your credit balance is down to ${}. Top up from the \
             dashboard to keep new test PRs coming.{SIGNATURE}",
            ctx.first_name,
            ctx.balance_usd.max(0),
        )
    } else {
        format!(
            "Hi {}, your trial credits are nearly gone (${} left). Top up from \
             the dashboard to keep test generation running.{SIGNATURE}",
            ctx.first_name,
            ctx.balance_usd.max(0),
        )
    };
    EmailContent {
        subject: "Keep your credits topped up".to_string(),
        body,
    }
}

/// `dormant_reintro`: single reintroduction for inactive accounts.
#[must_use]
pub fn dormant_reintro(ctx: &OwnerDripContext) -> EmailContent {
    EmailContent {
        subject: "A lot is new in Covgen".to_string(),
        body: format!(
            "Hi {}, Covgen has not generated anything for you in a while, and \
             the product has come a long way. Reply to this email if you would \
             like help getting set up again.{SIGNATURE}",
            ctx.first_name,
        ),
    }
}

/// Milestone email for crossing a coverage band.
#[must_use]
pub fn coverage_milestone(ctx: &OwnerDripContext, band: u8) -> EmailContent {
    EmailContent {
        subject: format!("{band}% coverage unlocked"),
        body: format!(
            "Hi {}, {} just crossed {band}% line coverage. Nice work. Keep \
             merging Covgen PRs to push it higher.{SIGNATURE}",
            ctx.first_name,
            clip(&ctx.owner_name, MAX_REPO_CHARS),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_short_names_and_marks_long_ones() {
        assert_eq!(clip("api", 10), "api");
        let clipped = clip(&"r".repeat(60), 10);
        assert_eq!(clipped.chars().count(), 10);
        assert!(clipped.ends_with('…'));
    }
}
