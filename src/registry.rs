// src/registry.rs
// =============================================================================
// The batch registry: every verify call records the URLs it was given under a
// fresh, sequential batch ID so a later report can replay them.
//
// Rules:
// - IDs start at 1 and only ever go up; a number is never handed out twice
// - Batches are immutable once stored and are never deleted
// - URLs are stored lower-cased, in submission order, duplicates kept
//
// The ID counter is an atomic and the map has its own RwLock, so creating a
// batch never contends with the liveness cache.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Identifier of a stored batch
pub type BatchId = u64;

/// Cache keys and batch entries are the lower-cased URL, nothing more
pub fn normalize_url(url: &str) -> String {
    url.to_lowercase()
}

/// Append-only store of submitted URL batches
#[derive(Debug, Default)]
pub struct BatchRegistry {
    last_id: AtomicU64,
    batches: RwLock<HashMap<BatchId, Arc<[String]>>>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `hint` pre-sizes the map; it does not limit how many batches fit
    pub fn with_capacity(hint: usize) -> Self {
        Self {
            last_id: AtomicU64::new(0),
            batches: RwLock::new(HashMap::with_capacity(hint)),
        }
    }

    /// Stores `urls` (normalized) and returns the new batch ID
    pub fn create_batch<I, S>(&self, urls: I) -> BatchId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Arc<[String]> = urls
            .into_iter()
            .map(|url| normalize_url(url.as_ref()))
            .collect();

        // fetch_add hands every caller a distinct number even without the lock
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.batches.write().insert(id, urls);
        id
    }

    /// Returns the URLs of batch `id`, or `None` if it was never created
    pub fn get_batch(&self, id: BatchId) -> Option<Arc<[String]>> {
        self.batches.read().get(&id).cloned()
    }

    /// Number of batches stored so far
    pub fn len(&self) -> usize {
        self.batches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let registry = BatchRegistry::new();
        let ids: Vec<_> = (0..5).map(|_| registry.create_batch(["a.com"])).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_urls_are_normalized_and_kept_in_order() {
        let registry = BatchRegistry::with_capacity(4);
        let id = registry.create_batch(["B.com", "a.COM", "b.com"]);
        let urls = registry.get_batch(id).unwrap();
        assert_eq!(&*urls, &["b.com", "a.com", "b.com"]);
    }

    #[test]
    fn test_normalize_url_only_lower_cases() {
        assert_eq!(normalize_url("HTTPS://Example.COM/Path"), "https://example.com/path");
        // No trailing-slash or scheme rewriting
        assert_eq!(normalize_url("Example.com/"), "example.com/");
    }

    #[test]
    fn test_unknown_batch() {
        let registry = BatchRegistry::new();
        assert!(registry.get_batch(999).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_creation_has_no_gaps() {
        let registry = Arc::new(BatchRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            let id = registry.create_batch([format!("t{}-{}.com", t, i)]);
                            // A freshly returned ID is immediately readable
                            assert!(registry.get_batch(id).is_some());
                            id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<BatchId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 400);
        assert_eq!(ids, (1..=400).collect());
    }
}
