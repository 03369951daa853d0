// src/engine.rs
// =============================================================================
// The verification engine: the two operations clients call.
//
// verify(urls):
// 1. Lower-case every URL
// 2. Split the distinct URLs into cache hits and misses
// 3. Probe every miss concurrently and wait for ALL of them (join barrier)
// 4. Merge hits and probe results, one entry per distinct URL
// 5. Record the full URL list (duplicates included) as a new batch
// 6. Write the freshly probed statuses into the cache
//
// report(batch_ids, renderer):
// - Looks up every batch first; an unknown ID aborts before any probing
// - Cache hits go straight into the result; the first batch to resolve a URL
//   wins
// - Misses from all batches are pooled and each one is probed once
// - The merged mapping is handed to the renderer
//
// The probe pass of each call runs under a deadline. If it expires the call
// fails with Timeout and nothing is written to the cache or the registry.
// =============================================================================

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::LivenessCache;
use crate::checker::{HttpProber, LinkStatus, Prober};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::{normalize_url, BatchId, BatchRegistry};
use crate::report::Renderer;

/// Tuning knobs for verify/report calls
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on probes in flight for a single call
    pub max_concurrent_probes: usize,
    /// How long a call may spend waiting for its probes
    pub call_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 50,
            call_deadline: Duration::from_secs(30),
        }
    }
}

/// Result of a verify call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// One entry per distinct (normalized) URL
    pub links: BTreeMap<String, LinkStatus>,
    /// Batch the submitted URLs were recorded under
    pub batch_id: BatchId,
}

/// Probes `urls` with at most `limit` requests in flight and returns once
/// every probe has finished. Results arrive in completion order.
pub(crate) async fn probe_all(
    prober: &dyn Prober,
    urls: Vec<String>,
    limit: usize,
) -> Vec<(String, LinkStatus)> {
    let futures = urls.into_iter().map(|url| async move {
        let status = prober.probe(&url).await;
        (url, status)
    });

    stream::iter(futures)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

pub struct VerificationEngine {
    cache: Arc<LivenessCache>,
    registry: Arc<BatchRegistry>,
    prober: Arc<dyn Prober>,
    config: EngineConfig,
}

impl VerificationEngine {
    pub fn new(
        cache: Arc<LivenessCache>,
        registry: Arc<BatchRegistry>,
        prober: Arc<dyn Prober>,
        config: EngineConfig,
    ) -> Self {
        Self {
            cache,
            registry,
            prober,
            config,
        }
    }

    /// Builds the production engine: HTTP prober, cache and registry sized
    /// from the config
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = LivenessCache::new(config.storage.cache_size)?;
        let registry = BatchRegistry::with_capacity(config.storage.links_size);
        let prober = HttpProber::new(config.checker.probe_timeout())?;

        Ok(Self::new(
            Arc::new(cache),
            Arc::new(registry),
            Arc::new(prober),
            config.engine_config(),
        ))
    }

    pub fn cache(&self) -> &Arc<LivenessCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<BatchRegistry> {
        &self.registry
    }

    pub fn prober(&self) -> &Arc<dyn Prober> {
        &self.prober
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Checks every URL (from cache where possible) and records them as a
    /// new batch
    pub async fn verify<S: AsRef<str>>(&self, urls: &[S]) -> Result<Verification> {
        if urls.is_empty() {
            return Err(Error::EmptyInput);
        }

        let started = Instant::now();
        let normalized: Vec<String> = urls.iter().map(|u| normalize_url(u.as_ref())).collect();

        let mut links = BTreeMap::new();
        let mut uncached = Vec::new();
        let mut seen = HashSet::with_capacity(normalized.len());

        for url in &normalized {
            // Duplicates collapse to a single lookup and a single probe
            if !seen.insert(url.as_str()) {
                continue;
            }
            match self.cache.get(url) {
                Some(status) => {
                    links.insert(url.clone(), status);
                }
                None => uncached.push(url.clone()),
            }
        }

        let cached = links.len();
        let probed = self.probe_within_deadline(uncached).await?;
        links.extend(probed.iter().cloned());

        let batch_id = self.registry.create_batch(&normalized);
        let probed_count = probed.len();
        self.cache.put_many(probed);

        info!(
            batch_id,
            submitted = normalized.len(),
            distinct = links.len(),
            cached,
            probed = probed_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verified links"
        );

        Ok(Verification { links, batch_id })
    }

    /// Resolves the statuses of every URL in the given batches, probing only
    /// what the cache no longer holds
    pub async fn report_statuses(
        &self,
        batch_ids: &[BatchId],
    ) -> Result<BTreeMap<String, LinkStatus>> {
        if batch_ids.is_empty() {
            return Err(Error::EmptyInput);
        }

        let batches = batch_ids
            .iter()
            .map(|&id| {
                self.registry.get_batch(id).ok_or_else(|| {
                    warn!(batch_id = id, "report requested unknown batch");
                    Error::BatchNotFound(id)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut statuses: BTreeMap<String, LinkStatus> = BTreeMap::new();
        let mut missed: HashSet<&str> = HashSet::new();
        let mut misses = Vec::new();

        for batch in &batches {
            for url in batch.iter() {
                if statuses.contains_key(url) || missed.contains(url.as_str()) {
                    continue;
                }
                match self.cache.get(url) {
                    Some(status) => {
                        statuses.insert(url.clone(), status);
                    }
                    None => {
                        missed.insert(url.as_str());
                        misses.push(url.clone());
                    }
                }
            }
        }

        debug!(
            batches = batches.len(),
            cached = statuses.len(),
            misses = misses.len(),
            "resolving report"
        );

        let probed = self.probe_within_deadline(misses).await?;
        for (url, status) in &probed {
            statuses.entry(url.clone()).or_insert(*status);
        }
        self.cache.put_many(probed);

        Ok(statuses)
    }

    /// Builds a report over `batch_ids` and renders it
    pub async fn report(&self, batch_ids: &[BatchId], renderer: &dyn Renderer) -> Result<Vec<u8>> {
        let statuses = self.report_statuses(batch_ids).await?;
        let bytes = renderer.render(&statuses)?;

        info!(
            batches = batch_ids.len(),
            links = statuses.len(),
            bytes = bytes.len(),
            "rendered report"
        );

        Ok(bytes)
    }

    async fn probe_within_deadline(&self, urls: Vec<String>) -> Result<Vec<(String, LinkStatus)>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let deadline = self.config.call_deadline;
        let pass = probe_all(
            self.prober.as_ref(),
            urls,
            self.config.max_concurrent_probes,
        );

        tokio::time::timeout(deadline, pass).await.map_err(|_| {
            warn!(?deadline, "probe pass exceeded call deadline");
            Error::Timeout(deadline)
        })
    }
}
