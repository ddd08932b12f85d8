//! Environment-driven configuration.
//!
//! The required variables mirror the deployment contract: the process
//! refuses to start without the mailbox and relay coordinates. Everything
//! else has a default or is optional.

use chrono::NaiveDate;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default similarity threshold for the intent matcher.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Default chart renderer endpoint (QuickChart-compatible).
pub const DEFAULT_CHART_URL: &str = "https://quickchart.io/chart";

/// Variables that must be present for the process to start.
const REQUIRED_VARS: &[&str] = &[
    "EMAIL_USER",
    "EMAIL_PASSWORD",
    "EMAIL_HOST",
    "EMAIL_PORT",
    "SMTP_HOST",
    "SMTP_PORT",
];

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IMAP server host.
    pub imap_host: String,
    /// IMAP server port (usually 993 for TLS).
    pub imap_port: u16,
    /// Whether the IMAP connection uses TLS.
    pub imap_tls: bool,
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// Whether the SMTP connection uses TLS.
    pub smtp_secure: bool,
    /// Mailbox account, also the reply From address.
    pub user: String,
    /// Mailbox/relay password.
    pub password: SecretString,
    /// Intent matcher threshold in [0, 1].
    pub similarity_threshold: f64,
    /// Only messages received on/after this date are swept.
    pub start_date: Option<NaiveDate>,
    /// Analysis API credential. Optional at startup — the card summary
    /// action fails per-request when it is missing.
    pub openai_api_key: Option<SecretString>,
    /// Chart renderer endpoint.
    pub chart_url: String,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source (injectable for tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| lookup(key).as_deref().unwrap_or("").is_empty())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVar(missing.join(", ")));
        }

        let parse_port = |key: &str| -> Result<u16, ConfigError> {
            let raw = lookup(key).unwrap_or_default();
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a port number, got {raw:?}"),
            })
        };

        let similarity_threshold = match lookup("SIMILARITY_THRESHOLD") {
            Some(raw) => {
                let value: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "SIMILARITY_THRESHOLD".into(),
                    message: format!("expected a float, got {raw:?}"),
                })?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        key: "SIMILARITY_THRESHOLD".into(),
                        message: format!("{value} is outside [0, 1]"),
                    });
                }
                value
            }
            None => DEFAULT_SIMILARITY_THRESHOLD,
        };

        let start_date = match lookup("START_DATE") {
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
                ConfigError::InvalidValue {
                    key: "START_DATE".into(),
                    message: format!("expected YYYY-MM-DD: {e}"),
                }
            })?),
            None => None,
        };

        Ok(Self {
            imap_host: lookup("EMAIL_HOST").unwrap_or_default(),
            imap_port: parse_port("EMAIL_PORT")?,
            imap_tls: lookup("EMAIL_TLS").as_deref() == Some("true"),
            smtp_host: lookup("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_port("SMTP_PORT")?,
            smtp_secure: lookup("SMTP_SECURE").as_deref() == Some("true"),
            user: lookup("EMAIL_USER").unwrap_or_default(),
            password: SecretString::from(lookup("EMAIL_PASSWORD").unwrap_or_default()),
            similarity_threshold,
            start_date,
            openai_api_key: lookup("OPENAI_API_KEY").map(SecretString::from),
            chart_url: lookup("CHART_RENDER_URL").unwrap_or_else(|| DEFAULT_CHART_URL.into()),
        })
    }
}
