// src/testing.rs
// =============================================================================
// Test doubles shared by the engine, revalidator and server tests.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::checker::{LinkStatus, Prober};

/// A prober that answers from a table instead of the network.
///
/// Unknown URLs are not available. Every call is recorded.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProber {
    statuses: Mutex<HashMap<String, LinkStatus>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Each probe sleeps for `delay` before answering
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn set(&self, url: &str, status: LinkStatus) {
        self.statuses.lock().insert(url.to_string(), status);
    }

    pub(crate) fn available(self, urls: &[&str]) -> Self {
        for url in urls {
            self.set(url, LinkStatus::Available);
        }
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str) -> LinkStatus {
        self.calls.lock().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.statuses
            .lock()
            .get(url)
            .copied()
            .unwrap_or(LinkStatus::NotAvailable)
    }
}
