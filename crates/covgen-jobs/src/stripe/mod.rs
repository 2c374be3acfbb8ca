//! Stripe integration for the auto-reload sweep.

pub mod client;
pub mod types;

pub use client::{StripeCharger, StripeError};
pub use types::{PaymentIntent, StripeErrorResponse};
