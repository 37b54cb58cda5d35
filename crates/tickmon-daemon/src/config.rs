use serde::{Deserialize, Serialize};
use tickmon_common::types::Recipients;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between scan passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Path of the persisted rule document.
    #[serde(default = "default_alerts_path")]
    pub alerts_path: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Metrics endpoint returning a JSON array of metric rows.
    #[serde(default = "default_source_endpoint")]
    pub endpoint: String,
    /// Directory of `*.txt` watchlist files naming the ticker universe.
    /// Omit to request the endpoint's full universe.
    #[serde(default)]
    pub watchlist_dir: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_source_endpoint(),
            watchlist_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Webhook URLs used when a rule has none of its own. A single string
    /// is accepted in place of a list.
    #[serde(default)]
    pub default_webhook: Recipients,
    /// Email address used when a rule has none of its own.
    #[serde(default)]
    pub default_email: Option<String>,
    /// Fallback webhook display name.
    #[serde(default = "default_webhook_username")]
    pub webhook_username: String,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            default_webhook: Recipients::default(),
            default_email: None,
            webhook_username: default_webhook_username(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Transactional-email provider API key. Absent → email sends are
    /// skipped with a logged notice.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_email_endpoint(),
            sender_name: default_sender_name(),
            sender_email: default_sender_email(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_alerts_path() -> String {
    "alerts/alerts.json".to_string()
}

fn default_source_endpoint() -> String {
    "http://127.0.0.1:9000/metrics".to_string()
}

fn default_webhook_username() -> String {
    "tickmon".to_string()
}

fn default_email_endpoint() -> String {
    "https://api.brevo.com/v3/smtp/email".to_string()
}

fn default_sender_name() -> String {
    "tickmon".to_string()
}

fn default_sender_email() -> String {
    "alerts@tickmon.local".to_string()
}

impl DaemonConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
