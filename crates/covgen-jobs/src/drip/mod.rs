//! The lifecycle ("drip") email engine.
//!
//! Split into a pure decision core and a thin IO shell:
//!
//! - [`context`]: the immutable per-owner snapshot the decision consumes,
//!   and the [`context::ActivityFeed`] collaborator that supplies the
//!   product-side half of it (coverage, PRs).
//! - [`engine`]: `decide(&OwnerDripContext) -> DripDecision`, the whole
//!   slot state machine with no IO.
//! - [`templates`]: pure subject/body renderers.
//! - [`runner`]: loads snapshots, applies `decide`, delivers, and records
//!   sent markers.

pub mod context;
pub mod engine;
pub mod runner;
pub mod templates;

pub use context::{
    ActivityFeed, CoverageSnapshot, DashboardFeed, OwnerActivity, OwnerDripContext, SetupPrState,
    TestPr,
};
pub use engine::{decide, DripDecision, NoOpReason, SlotOutcome, DORMANT_AFTER_DAYS};
pub use runner::{DripEntry, DripOutcome, DripReport, DripRunner};
