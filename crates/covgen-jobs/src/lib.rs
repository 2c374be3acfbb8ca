//! Scheduled billing jobs for Covgen.
//!
//! Each job is a stateless async function invoked by an external scheduler
//! once per period; nothing here runs inside a persistent process. The
//! jobs share a common shape: enumerate work (fatal on failure), process
//! each unit through a function that cannot fail the run, and return a
//! serializable report the cron entry point prints.
//!
//! - [`auto_reload`]: charge saved payment methods back up to the owner's
//!   target when the balance falls to the threshold, capped by the
//!   [`spending_limit`] validator.
//! - [`expiration`]: fold expired credit rows into per-owner offsetting
//!   ledger entries.
//! - [`drip`]: the lifecycle-email slot engine.
//!
//! External collaborators (Stripe, Slack, Resend, the dashboard's activity
//! API) sit behind narrow traits so the jobs can be exercised against
//! in-test fakes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alert;
pub mod auto_reload;
pub mod charge;
pub mod config;
pub mod drip;
pub mod expiration;
pub mod mailer;
pub mod spending_limit;
pub mod stripe;

pub use alert::{Alerter, NoopAlerter, SlackAlerter};
pub use auto_reload::{run_auto_reload_sweep, OwnerReloadResult, ReloadOutcome, SweepReport};
pub use charge::{ChargeOutcome, ChargeRequest, PaymentCharger};
pub use config::JobsConfig;
pub use drip::{DripReport, DripRunner};
pub use expiration::{expire_credits, ExpirationReport, OwnerExpiration};
pub use mailer::{Mailer, ResendMailer, SendOutcome};
pub use spending_limit::{
    decide_spending_limit, month_start, validate_spending_limit, SpendingLimitDecision,
};
pub use stripe::StripeCharger;
