// src/revalidate.rs
// =============================================================================
// Background revalidation of the liveness cache.
//
// A single tokio task wakes up on a fixed interval, snapshots every cached
// URL, probes them all again and writes back only the statuses that changed.
//
// States:
//   Idle --tick--> Running --pass done--> Idle ... --shutdown--> Stopped
//
// The loop waits on `tokio::select!` over {ticker, shutdown channel}. A pass
// that is already running is allowed to finish; the stop signal is picked up
// the next time the loop waits. Cache writes are per-entry, so abandoning the
// loop between passes never leaves the cache half-updated.
// =============================================================================

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cache::LivenessCache;
use crate::checker::Prober;
use crate::engine::probe_all;
use crate::error::{Error, Result};

/// Settings for the background loop
#[derive(Debug, Clone)]
pub struct RevalidatorConfig {
    /// Time between passes; the first pass runs one interval after start
    pub interval: Duration,
    /// Upper bound on probes in flight during a pass
    pub max_concurrent_probes: usize,
}

impl Default for RevalidatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            max_concurrent_probes: 50,
        }
    }
}

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidatorState {
    Idle,
    Running,
    Stopped,
}

impl RevalidatorState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RevalidatorState::Idle,
            1 => RevalidatorState::Running,
            _ => RevalidatorState::Stopped,
        }
    }
}

/// Outcome of one revalidation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// URLs re-probed
    pub checked: usize,
    /// Entries whose status flipped and were written back
    /// (evicted mid-pass URLs are not counted)
    pub changed: usize,
}

/// Re-probes every cached URL once and writes back the ones that changed
pub async fn revalidate_once(
    cache: &LivenessCache,
    prober: &dyn Prober,
    max_concurrent_probes: usize,
) -> PassSummary {
    let snapshot = cache.all_entries();
    let urls: Vec<String> = snapshot.keys().cloned().collect();

    let results = probe_all(prober, urls, max_concurrent_probes).await;
    let checked = results.len();

    let changed: Vec<_> = results
        .into_iter()
        .filter(|(url, status)| snapshot.get(url) != Some(status))
        .collect();

    // Untouched entries keep their recency; only flips are written, and only
    // for URLs that were not evicted while the pass ran
    let changed = cache.update_many(changed);

    PassSummary { checked, changed }
}

/// Handle to the running background loop
pub struct Revalidator {
    shutdown_tx: mpsc::Sender<()>,
    state: Arc<AtomicU8>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Revalidator {
    /// Starts the loop on the current tokio runtime
    pub fn spawn(
        cache: Arc<LivenessCache>,
        prober: Arc<dyn Prober>,
        config: RevalidatorConfig,
    ) -> Self {
        // Capacity 1: one pending stop signal is all the loop ever needs
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let state = Arc::new(AtomicU8::new(RevalidatorState::Idle as u8));

        let handle = tokio::spawn(run_loop(
            cache,
            prober,
            config,
            shutdown_rx,
            Arc::clone(&state),
        ));

        Self {
            shutdown_tx,
            state,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn state(&self) -> RevalidatorState {
        RevalidatorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Asks the loop to stop.
    ///
    /// Returns once the signal is queued or the loop has already exited. If
    /// neither happens within `deadline`, fails with `ShutdownTimeout`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<()> {
        match tokio::time::timeout(deadline, self.shutdown_tx.send(())).await {
            Ok(Ok(())) => Ok(()),
            // Receiver gone: the loop is already stopped
            Ok(Err(_)) => Ok(()),
            Err(_) => Err(Error::ShutdownTimeout(deadline)),
        }
    }

    /// Waits for the loop task to exit. Call after `shutdown`.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "revalidator task failed");
            }
        }
    }
}

async fn run_loop(
    cache: Arc<LivenessCache>,
    prober: Arc<dyn Prober>,
    config: RevalidatorConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
    state: Arc<AtomicU8>,
) {
    let start = tokio::time::Instant::now() + config.interval;
    let mut ticker = tokio::time::interval_at(start, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?config.interval, "cache revalidation started");

    loop {
        tokio::select! {
            // A pending stop signal wins over an overdue tick
            biased;

            _ = shutdown_rx.recv() => {
                break;
            }
            _ = ticker.tick() => {
                state.store(RevalidatorState::Running as u8, Ordering::SeqCst);
                let started = Instant::now();
                info!(entries = cache.len(), "starting cache revalidation");

                let summary =
                    revalidate_once(&cache, prober.as_ref(), config.max_concurrent_probes).await;

                info!(
                    checked = summary.checked,
                    changed = summary.changed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cache revalidation finished"
                );
                state.store(RevalidatorState::Idle as u8, Ordering::SeqCst);
            }
        }
    }

    state.store(RevalidatorState::Stopped as u8, Ordering::SeqCst);
    info!("cache revalidation stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::LinkStatus::{Available, NotAvailable};
    use crate::testing::ScriptedProber;

    const INTERVAL: Duration = Duration::from_secs(15 * 60);

    fn config() -> RevalidatorConfig {
        RevalidatorConfig {
            interval: INTERVAL,
            max_concurrent_probes: 8,
        }
    }

    #[tokio::test]
    async fn test_pass_writes_back_only_changes() {
        let cache = LivenessCache::new(10).unwrap();
        cache.put("flips.com", Available);
        cache.put("steady.com", NotAvailable);
        cache.put("fresh.com", Available);

        let prober = ScriptedProber::new().available(&["fresh.com"]);
        let summary = revalidate_once(&cache, &prober, 4).await;

        assert_eq!(summary, PassSummary { checked: 3, changed: 1 });
        assert_eq!(cache.get("flips.com"), Some(NotAvailable));
        assert_eq!(prober.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unchanged_entries_keep_recency() {
        let cache = LivenessCache::new(10).unwrap();
        cache.put("flips.com", Available);
        cache.put("steady.com", NotAvailable);
        assert_eq!(cache.keys_by_recency(), vec!["steady.com", "flips.com"]);

        revalidate_once(&cache, &ScriptedProber::new(), 4).await;

        // Only the flipped entry moved to the front
        assert_eq!(cache.keys_by_recency(), vec!["flips.com", "steady.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_does_not_resurrect_evicted_urls() {
        let cache = Arc::new(LivenessCache::new(2).unwrap());
        cache.put("old.com", Available);
        cache.put("live.com", Available);

        let prober = ScriptedProber::with_delay(Duration::from_secs(5));
        let pass = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { revalidate_once(&cache, &prober, 4).await })
        };

        // While the pass is probing, a verify pushes "old.com" out
        tokio::time::sleep(Duration::from_secs(1)).await;
        cache.put("new.com", Available);
        cache.get("live.com");

        let summary = pass.await.unwrap();
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.changed, 1);
        assert_eq!(cache.get("old.com"), None);
        assert_eq!(cache.get("new.com"), Some(Available));
        assert_eq!(cache.get("live.com"), Some(NotAvailable));
    }

    #[tokio::test]
    async fn test_empty_cache_pass() {
        let cache = LivenessCache::new(4).unwrap();
        let prober = ScriptedProber::new();
        let summary = revalidate_once(&cache, &prober, 4).await;
        assert_eq!(summary, PassSummary::default());
        assert_eq!(prober.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_on_interval() {
        let cache = Arc::new(LivenessCache::new(10).unwrap());
        cache.put("a.com", Available);
        let prober = Arc::new(ScriptedProber::new());

        let revalidator = Revalidator::spawn(cache.clone(), prober.clone(), config());

        // Nothing happens before the first interval elapses
        tokio::time::sleep(INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(prober.call_count(), 0);
        assert_eq!(cache.get("a.com"), Some(Available));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(prober.call_count(), 1);
        assert_eq!(cache.get("a.com"), Some(NotAvailable));
        assert_eq!(revalidator.state(), RevalidatorState::Idle);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(prober.call_count(), 2);

        revalidator.shutdown(Duration::from_secs(1)).await.unwrap();
        revalidator.join().await;
        assert_eq!(revalidator.state(), RevalidatorState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_prompt_and_repeatable() {
        let cache = Arc::new(LivenessCache::new(10).unwrap());
        let revalidator = Revalidator::spawn(cache, Arc::new(ScriptedProber::new()), config());

        revalidator.shutdown(Duration::from_secs(1)).await.unwrap();
        revalidator.join().await;
        assert_eq!(revalidator.state(), RevalidatorState::Stopped);

        // Loop already gone: a second call returns instead of blocking
        revalidator.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_pass_finishes_before_stop() {
        let cache = Arc::new(LivenessCache::new(10).unwrap());
        cache.put("slow.com", Available);
        let prober = Arc::new(ScriptedProber::with_delay(Duration::from_secs(600)));

        let revalidator = Revalidator::spawn(
            cache.clone(),
            prober.clone(),
            RevalidatorConfig {
                interval: Duration::from_secs(1),
                max_concurrent_probes: 1,
            },
        );

        // Let the first pass start; its probe now sleeps for ten minutes
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(revalidator.state(), RevalidatorState::Running);

        // The first signal is queued; the loop is busy so a second one can't be
        revalidator.shutdown(Duration::from_secs(1)).await.unwrap();
        let second = revalidator.shutdown(Duration::from_secs(1)).await;
        assert!(matches!(second, Err(Error::ShutdownTimeout(_))));

        revalidator.join().await;
        assert_eq!(revalidator.state(), RevalidatorState::Stopped);
        // The pass completed and wrote its result
        assert_eq!(cache.get("slow.com"), Some(NotAvailable));
        assert_eq!(prober.call_count(), 1);
    }
}
