use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the metrics-row field holding the ticker symbol.
pub const SYMBOL_FIELD: &str = "Ticker";

/// Notification channel an alert rule delivers on.
///
/// # Examples
///
/// ```
/// use tickmon_common::types::Channel;
///
/// let ch: Channel = "webhook".parse().unwrap();
/// assert_eq!(ch, Channel::Webhook);
/// assert_eq!(ch.to_string(), "webhook");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Desktop,
    Webhook,
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Desktop => write!(f, "desktop"),
            Channel::Webhook => write!(f, "webhook"),
            Channel::Email => write!(f, "email"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" => Ok(Channel::Desktop),
            "webhook" => Ok(Channel::Webhook),
            "email" => Ok(Channel::Email),
            _ => Err(format!("unknown channel: {s}")),
        }
    }
}

/// Webhook URLs or email addresses attached to a rule.
///
/// The stored document accepts either a single string or a list; whichever
/// shape arrived is the shape written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Recipients::One(recipient) => std::slice::from_ref(recipient),
            Recipients::Many(recipients) => recipients,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Recipients::One(recipient) => recipient.is_empty(),
            Recipients::Many(recipients) => recipients.is_empty(),
        }
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::Many(Vec::new())
    }
}

/// A persisted alert rule.
///
/// Symbol rules live under [`RuleDocument::tickers`] keyed by ticker and are
/// consumed when they fire; scanner rules live in [`RuleDocument::scanners`]
/// and instead accumulate fired symbols in `triggered`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique within the rule's scope; backfilled by the store when empty.
    #[serde(default)]
    pub id: String,
    /// Boolean condition over the metrics row's space-stripped field names.
    pub expression: String,
    /// Text sent on trigger.
    pub message: String,
    #[serde(default)]
    pub channel: Channel,
    /// Overrides the configured default webhook URLs / email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Recipients>,
    /// Webhook display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Scanner rules only: symbols this rule has already fired for. Absent
    /// until the first trigger; never cleared automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered: Option<Vec<String>>,
}

/// The persisted rule document:
/// `{"tickers": {"<SYMBOL>": [rule, ...]}, "scanners": [rule, ...]}`.
///
/// Stored order is evaluation order, so the ticker mapping is an
/// [`IndexMap`] rather than a hash map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub tickers: IndexMap<String, Vec<AlertRule>>,
    #[serde(default)]
    pub scanners: Vec<AlertRule>,
}

impl RuleDocument {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty() && self.scanners.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.tickers.values().map(Vec::len).sum::<usize>() + self.scanners.len()
    }
}

/// One cell of a metrics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Null,
}

/// One ticker's current snapshot of computed indicators.
///
/// Field names come straight from the metrics table and may contain spaces
/// (`"Market Cap"`); the expression evaluator strips spaces before binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsRow {
    pub fields: IndexMap<String, FieldValue>,
}

impl MetricsRow {
    pub fn symbol(&self) -> Option<&str> {
        match self.fields.get(SYMBOL_FIELD) {
            Some(FieldValue::Text(symbol)) => Some(symbol),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for MetricsRow {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A rule that fired for a symbol, queued for notification dispatch.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub rule: AlertRule,
    pub symbol: String,
    pub row: MetricsRow,
}
