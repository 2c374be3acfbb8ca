//! The drip IO shell.
//!
//! Everything effectful lives here: loading owners and sent-key sets from
//! the store, fetching activity from the feed, delivering through the
//! mailer, and recording sent markers. The marker is written only after
//! the mailer reports success, so a failed delivery is retried naturally
//! on the next scheduled run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use covgen_core::{EmailKey, Owner, OutboundEmail, OwnerId, Result};
use covgen_store::Store;

use super::context::{ActivityFeed, OwnerDripContext};
use super::engine::{decide, DripDecision, NoOpReason};
use crate::mailer::{Mailer, SendOutcome};

/// Result of one drip run.
#[derive(Debug, Serialize)]
pub struct DripReport {
    /// Number of owners evaluated.
    pub processed: usize,

    /// Number of emails sent.
    pub sent: usize,

    /// Per-owner outcomes, in no guaranteed order.
    pub entries: Vec<DripEntry>,
}

/// One owner's outcome.
#[derive(Debug, Serialize)]
pub struct DripEntry {
    /// The owner.
    pub owner_id: OwnerId,

    /// What happened.
    #[serde(flatten)]
    pub outcome: DripOutcome,
}

/// What happened to one owner during a drip run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DripOutcome {
    /// An email was delivered and recorded.
    Sent {
        /// The slot that fired.
        key: EmailKey,
        /// Provider-side id of the accepted email.
        email_id: String,
    },

    /// Nothing to send.
    NoOp {
        /// Why nothing was sent.
        reason: NoOpReason,
    },

    /// The owner's processing failed; retried next run.
    Failed {
        /// Error text.
        error: String,
    },
}

/// Runs the drip engine against real collaborators.
pub struct DripRunner<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    feed: &'a dyn ActivityFeed,
}

impl<'a> DripRunner<'a> {
    /// Create a runner.
    #[must_use]
    pub fn new(store: &'a dyn Store, mailer: &'a dyn Mailer, feed: &'a dyn ActivityFeed) -> Self {
        Self {
            store,
            mailer,
            feed,
        }
    }

    /// Evaluate every installed owner and send at most one email each.
    ///
    /// # Errors
    ///
    /// Returns an error only when the owner list or the sent-email log
    /// cannot be read; per-owner failures are folded into the report.
    pub async fn process_drip_emails(&self, now: DateTime<Utc>) -> Result<DripReport> {
        let owners = self.store.list_installed_owners()?;
        let ids: Vec<OwnerId> = owners.iter().map(|o| o.id).collect();
        let mut sent_sets = self.store.sent_email_keys(&ids)?;

        tracing::info!(owners = owners.len(), "Starting drip run");

        let mut entries = Vec::with_capacity(owners.len());
        let mut sent = 0;

        for owner in &owners {
            let sent_keys = sent_sets.remove(&owner.id).unwrap_or_default();
            let outcome = self.process_owner(owner, sent_keys, now).await;

            if matches!(outcome, DripOutcome::Sent { .. }) {
                sent += 1;
            }

            entries.push(DripEntry {
                owner_id: owner.id,
                outcome,
            });
        }

        Ok(DripReport {
            processed: entries.len(),
            sent,
            entries,
        })
    }

    /// Process one owner. Cannot fail the run.
    async fn process_owner(
        &self,
        owner: &Owner,
        sent_keys: std::collections::HashSet<EmailKey>,
        now: DateTime<Utc>,
    ) -> DripOutcome {
        let activity = match self.feed.owner_activity(owner.id).await {
            Ok(activity) => activity,
            Err(e) => {
                tracing::warn!(owner_id = %owner.id, error = %e, "Activity feed failed");
                return DripOutcome::Failed {
                    error: format!("activity feed: {e}"),
                };
            }
        };

        let has_purchased = match self.store.has_purchased(owner.id) {
            Ok(has_purchased) => has_purchased,
            Err(e) => {
                tracing::warn!(owner_id = %owner.id, error = %e, "Purchase lookup failed");
                return DripOutcome::Failed {
                    error: format!("purchase lookup: {e}"),
                };
            }
        };

        let ctx = OwnerDripContext::assemble(owner, activity, sent_keys, has_purchased, now);

        match decide(&ctx) {
            DripDecision::NoOp { reason } => {
                tracing::debug!(owner_id = %owner.id, reason = ?reason, "No drip email due");
                DripOutcome::NoOp { reason }
            }
            DripDecision::Send { key, email } => {
                let outbound = OutboundEmail {
                    to: ctx.billing_email.clone(),
                    subject: email.subject,
                    text: email.body,
                };

                match self.mailer.send(&outbound).await {
                    SendOutcome::Sent { email_id } => {
                        // Marker write failure means this key may be sent
                        // again next run; surfaced so operators see it.
                        if let Err(e) = self.store.record_email_sent(owner.id, key) {
                            tracing::error!(
                                owner_id = %owner.id,
                                key = %key,
                                error = %e,
                                "Email sent but marker write failed"
                            );
                            return DripOutcome::Failed {
                                error: format!("sent {key} but marker write failed: {e}"),
                            };
                        }

                        tracing::info!(
                            owner_id = %owner.id,
                            key = %key,
                            email_id = %email_id,
                            "Drip email sent"
                        );
                        DripOutcome::Sent { key, email_id }
                    }
                    SendOutcome::Failed { error } => {
                        // No marker: the next run retries the same slot.
                        tracing::warn!(
                            owner_id = %owner.id,
                            key = %key,
                            error = %error,
                            "Drip email delivery failed"
                        );
                        DripOutcome::Failed { error }
                    }
                }
            }
        }
    }
}
