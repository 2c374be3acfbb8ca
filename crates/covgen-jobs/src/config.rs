//! Job configuration.

use serde::Deserialize;
use std::path::Path;

/// Configuration for the billing jobs, loaded from environment variables
/// with a secrets-file fallback for API keys.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Path to the `RocksDB` data directory (default: "/data/covgen").
    pub data_dir: String,

    /// Stripe API key (optional; auto-reload is disabled without it).
    pub stripe_api_key: Option<String>,

    /// Slack incoming-webhook URL for operator alerts (optional).
    pub slack_webhook_url: Option<String>,

    /// Resend API key (optional; drip emails are disabled without it).
    pub resend_api_key: Option<String>,

    /// Sender address for lifecycle emails.
    pub email_from: String,

    /// Dashboard base URL for the activity feed (optional).
    pub dashboard_url: Option<String>,

    /// Service API key for the dashboard's internal endpoints.
    pub service_api_key: Option<String>,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
}

/// Resend secrets file structure.
#[derive(Debug, Deserialize)]
struct ResendSecrets {
    api_key: String,
}

impl JobsConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let stripe_api_key = load_secret::<StripeSecrets>("stripe")
            .map(|s| s.api_key)
            .or_else(|| std::env::var("STRIPE_API_KEY").ok());

        let resend_api_key = load_secret::<ResendSecrets>("resend")
            .map(|s| s.api_key)
            .or_else(|| std::env::var("RESEND_API_KEY").ok());

        Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/covgen".into()),
            stripe_api_key,
            slack_webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
            resend_api_key,
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Covgen <team@covgen.dev>".into()),
            dashboard_url: std::env::var("DASHBOARD_URL").ok(),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            data_dir: "/data/covgen".into(),
            stripe_api_key: None,
            slack_webhook_url: None,
            resend_api_key: None,
            email_from: "Covgen <team@covgen.dev>".into(),
            dashboard_url: None,
            service_api_key: None,
        }
    }
}

/// Load a secrets file for a service, trying the usual locations.
fn load_secret<T: serde::de::DeserializeOwned>(service: &str) -> Option<T> {
    let candidates = [
        format!(".secrets/{service}.json"),
        format!("covgen/.secrets/{service}.json"),
        format!("../.secrets/{service}.json"),
    ];

    for candidate in &candidates {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| serde_json::from_str(&contents).map_err(|e| e.to_string()))
        {
            Ok(secrets) => {
                tracing::info!(path = %candidate, service = %service, "Loaded secrets from file");
                return Some(secrets);
            }
            Err(e) => {
                tracing::warn!(path = %candidate, error = %e, "Ignoring unreadable secrets file");
            }
        }
    }

    tracing::debug!(service = %service, "Secrets file not found, using environment variables");
    None
}
