//! Metrics supply for the scan loop.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tickmon_common::types::MetricsRow;

/// The scan loop's view of the market-data layer: one call yields the
/// current metrics table, one row per ticker.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<MetricsRow>, FetchError>;
}

/// A failed table fetch. Recoverable at the pass level: the pass is
/// skipped and the loop continues on schedule.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("metrics fetch: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metrics fetch: failed to read watchlists: {0}")]
    Watchlist(#[from] std::io::Error),

    #[error("no tickers found in watchlists")]
    EmptyWatchlist,
}

/// Fetches the metrics table from an HTTP endpoint, optionally scoping the
/// request to the symbols listed in local watchlist files.
pub struct HttpMetricsSource {
    client: reqwest::Client,
    endpoint: String,
    watchlist_dir: Option<PathBuf>,
}

impl HttpMetricsSource {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        watchlist_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            watchlist_dir,
        }
    }

    fn request(&self) -> Result<reqwest::RequestBuilder, FetchError> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(dir) = &self.watchlist_dir {
            let symbols = read_watchlists(dir)?;
            if symbols.is_empty() {
                return Err(FetchError::EmptyWatchlist);
            }
            let symbols = symbols.into_iter().collect::<Vec<_>>().join(",");
            request = request.query(&[("symbols", symbols)]);
        }
        Ok(request)
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch(&self) -> Result<Vec<MetricsRow>, FetchError> {
        let response = self.request()?.send().await?.error_for_status()?;
        let table: Vec<MetricsRow> = response.json().await?;
        tracing::debug!(rows = table.len(), "Metrics table fetched");
        Ok(table)
    }
}

/// Collects the ticker universe from `*.txt` files in `dir`: one symbol per
/// line, uppercased and deduplicated; blank lines and `#` comments skipped.
pub fn read_watchlists(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut symbols = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            symbols.insert(line.to_uppercase());
        }
    }
    Ok(symbols)
}
