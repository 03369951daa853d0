// src/checker/probe.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes one HTTP GET request per URL with a per-request timeout
// - Follows a bounded number of redirects, then looks at the final status
// - Only "200 OK" counts as available; everything else is not-available
// - Classifies failures (timeout, DNS, TLS, ...) for the logs only
//
// A probe never returns an error. An unreachable host, a garbage response or
// a timeout all become `LinkStatus::NotAvailable`.
// =============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Reachability of a link, as stored in the cache and returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    /// The URL answered 200 OK
    Available,
    /// Anything else: error status, transport error, timeout
    NotAvailable,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Available => "available",
            LinkStatus::NotAvailable => "not-available",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LinkStatus::Available)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Performs a single reachability check.
///
/// The engine and the revalidator only see this trait, which lets tests swap
/// in a scripted prober instead of touching the network.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> LinkStatus;
}

// Why a probe came back not-available (only ever logged)
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProbeFailure {
    Status(u16),
    Timeout,
    TooManyRedirects,
    Dns,
    Connect,
    Tls,
    Other(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Status(code) => write!(f, "HTTP {}", code),
            ProbeFailure::Timeout => f.write_str("request timed out"),
            ProbeFailure::TooManyRedirects => f.write_str("too many redirects"),
            ProbeFailure::Dns => f.write_str("could not resolve hostname"),
            ProbeFailure::Connect => f.write_str("connection failed"),
            ProbeFailure::Tls => f.write_str("TLS certificate error"),
            ProbeFailure::Other(msg) => f.write_str(msg),
        }
    }
}

/// The production prober: a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Builds a prober whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        // We reuse this client for every probe (connection pooling)
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> LinkStatus {
        let target = probe_target(url);

        // The response (and its pooled connection) is dropped at the end of
        // this match on every path; the body is never read
        let outcome = match self.client.get(&target).send().await {
            Ok(response) => analyze_status(response.status()),
            Err(e) => Err(categorize_error(&e)),
        };

        match outcome {
            Ok(()) => LinkStatus::Available,
            Err(reason) => {
                debug!(url = %target, %reason, "probe failed");
                LinkStatus::NotAvailable
            }
        }
    }
}

/// Turns a cache key into something reqwest can request.
///
/// Keys usually come without a scheme ("example.com/page"); those get
/// `http://` in front. Keys that already name http or https are used as-is.
pub fn probe_target(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => url.to_string(),
        _ => format!("http://{}", url),
    }
}

// Only the canonical OK is a success; 204, 3xx left after redirect
// following, 4xx and 5xx all count as not available
fn analyze_status(status: StatusCode) -> std::result::Result<(), ProbeFailure> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ProbeFailure::Status(status.as_u16()))
    }
}

// reqwest errors can happen for many reasons; work out which for the log line
fn categorize_error(error: &reqwest::Error) -> ProbeFailure {
    let error_string = error.to_string().to_lowercase();

    if error.is_timeout() {
        ProbeFailure::Timeout
    } else if error.is_redirect() {
        ProbeFailure::TooManyRedirects
    } else if error.is_connect() {
        if error_string.contains("dns") {
            ProbeFailure::Dns
        } else {
            ProbeFailure::Connect
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        ProbeFailure::Tls
    } else {
        ProbeFailure::Other(error.to_string())
    }
}
