//! Covgen billing cron entry point.
//!
//! The external scheduler invokes this binary once per period with the job
//! to run as its single argument:
//!
//! ```text
//! covgen-cron auto-reload
//! covgen-cron expire-credits
//! covgen-cron drip-emails
//! ```
//!
//! Each job prints its run report as JSON on stdout; operators watch the
//! alert channel and these reports. The scheduler must not run two
//! instances of the same job concurrently (the sweep relies on that).

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use covgen_jobs::drip::DashboardFeed;
use covgen_jobs::{
    expire_credits, run_auto_reload_sweep, Alerter, DripRunner, JobsConfig, NoopAlerter,
    ResendMailer, SlackAlerter, StripeCharger,
};
use covgen_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,covgen=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let job = std::env::args().nth(1).ok_or(
        "usage: covgen-cron <auto-reload | expire-credits | drip-emails>",
    )?;

    let config = JobsConfig::from_env();

    tracing::info!(
        job = %job,
        data_dir = %config.data_dir,
        stripe_configured = %config.stripe_api_key.is_some(),
        slack_configured = %config.slack_webhook_url.is_some(),
        resend_configured = %config.resend_api_key.is_some(),
        "Starting billing job"
    );

    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    let report = match job.as_str() {
        "auto-reload" => {
            let api_key = config
                .stripe_api_key
                .as_ref()
                .ok_or("STRIPE_API_KEY is required for auto-reload")?;
            let charger = StripeCharger::new(api_key);

            let alerter: Box<dyn Alerter> = match &config.slack_webhook_url {
                Some(url) => Box::new(SlackAlerter::new(url)),
                None => Box::new(NoopAlerter),
            };

            let report = run_auto_reload_sweep(store.as_ref(), &charger, alerter.as_ref()).await?;
            serde_json::to_string_pretty(&report)?
        }
        "expire-credits" => {
            let report = expire_credits(store.as_ref(), chrono::Utc::now())?;
            serde_json::to_string_pretty(&report)?
        }
        "drip-emails" => {
            let api_key = config
                .resend_api_key
                .as_ref()
                .ok_or("RESEND_API_KEY is required for drip-emails")?;
            let mailer = ResendMailer::new(api_key, &config.email_from);

            let dashboard_url = config
                .dashboard_url
                .as_ref()
                .ok_or("DASHBOARD_URL is required for drip-emails")?;
            let service_key = config
                .service_api_key
                .as_ref()
                .ok_or("SERVICE_API_KEY is required for drip-emails")?;
            let feed = DashboardFeed::new(dashboard_url, service_key);

            let runner = DripRunner::new(store.as_ref(), &mailer, &feed);
            let report = runner.process_drip_emails(chrono::Utc::now()).await?;
            serde_json::to_string_pretty(&report)?
        }
        other => {
            return Err(format!("unknown job: {other}").into());
        }
    };

    println!("{report}");

    Ok(())
}
