//! Known Tor exit node addresses, used to recognise requests coming
//! through Tor.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::{with_retry_if, RetryConfig};

/// Default source of the exit list (TorDNSEL format).
pub const DEFAULT_EXIT_LIST_URL: &str = "https://check.torproject.org/exit-addresses";

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(_) => true,
            FetchError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// Thread-safe set of exit node IPs, replaced wholesale on each refresh.
#[derive(Debug, Default)]
pub struct TorExitSet {
    ips: RwLock<HashSet<IpAddr>>,
}

impl TorExitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match self.ips.read() {
            Ok(ips) => ips.contains(ip),
            Err(poisoned) => poisoned.into_inner().contains(ip),
        }
    }

    pub fn len(&self) -> usize {
        match self.ips.read() {
            Ok(ips) => ips.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn replace(&self, ips: HashSet<IpAddr>) {
        match self.ips.write() {
            Ok(mut current) => *current = ips,
            Err(poisoned) => *poisoned.into_inner() = ips,
        }
    }

    /// Download the exit list from `url` and replace the set with it.
    ///
    /// On failure the previous set is kept. An empty download is treated as
    /// a failure too.
    pub async fn update(&self, client: &reqwest::Client, url: &str, retry: &RetryConfig) -> Result<usize> {
        debug!("Fetching list of Tor exit nodes from {}", url);

        let body = with_retry_if(
            retry,
            "Tor exit list",
            || fetch(client, url),
            FetchError::is_retryable,
        )
        .await
        .with_context(|| format!("Failed to fetch Tor exit list from {}", url))?;

        let ips = parse_exit_addresses(&body);
        if ips.is_empty() {
            anyhow::bail!("Tor exit list from {} contained no addresses", url);
        }

        let count = ips.len();
        self.replace(ips);
        debug!("Retrieved a list of {} exit nodes", count);
        Ok(count)
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> std::result::Result<String, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(response.text().await?)
}

/// HTTP client used for the exit list download.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("whistle-node/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Addresses from `ExitAddress <ip> <date> <time>` lines; other lines and
/// unparsable addresses are skipped.
pub fn parse_exit_addresses(body: &str) -> HashSet<IpAddr> {
    body.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            if parts.next() != Some("ExitAddress") {
                return None;
            }
            let raw = parts.next()?;
            match raw.parse() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    warn!("Skipping malformed exit address: {}", raw);
                    None
                }
            }
        })
        .collect()
}
