// src/cache/lru.rs
// =============================================================================
// A fixed-capacity least-recently-used map.
//
// Layout:
// - `nodes` is a Vec of entries, each with `prev`/`next` indices forming a
//   doubly linked list ordered from most recently used (head) to least
//   recently used (tail)
// - `index` maps a key to its slot in `nodes`
//
// Entries are only ever removed by eviction, and eviction only happens while
// inserting a new key at capacity, so the evicted slot is reused in place and
// no free list is needed.
//
// This type is NOT thread-safe on its own; LivenessCache wraps it in a Mutex.
// =============================================================================

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

// Sentinel for "no neighbour"
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
pub(crate) struct Lru<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    head: usize,
    tail: usize,
}

impl<K, V> Lru<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Callers guarantee `capacity > 0`
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Looks up `key` and marks it most recently used
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        Some(&self.nodes[idx].value)
    }

    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// Returns the evicted key if a new insert pushed the map over capacity.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<K> {
        if let Some(&idx) = self.index.get(&key) {
            self.nodes[idx].value = value;
            self.move_to_front(idx);
            return None;
        }

        if self.nodes.len() < self.capacity {
            let idx = self.nodes.len();
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.attach_front(idx);
            self.index.insert(key, idx);
            return None;
        }

        // Full: recycle the least recently used slot for the new entry
        let idx = self.tail;
        self.detach(idx);
        let node = &mut self.nodes[idx];
        let evicted = std::mem::replace(&mut node.key, key.clone());
        node.value = value;
        self.index.remove(&evicted);
        self.index.insert(key, idx);
        self.attach_front(idx);
        Some(evicted)
    }

    /// Overwrites `key` only if it is still present, marking it most recently
    /// used. Never inserts and never evicts.
    pub(crate) fn update<Q>(&mut self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => {
                self.nodes[idx].value = value;
                self.move_to_front(idx);
                true
            }
            None => false,
        }
    }

    /// Iterates entries in arbitrary order without touching recency
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.nodes.iter().map(|node| (&node.key, &node.value))
    }

    /// Keys from most to least recently used
    pub(crate) fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while cursor != NIL {
            keys.push(self.nodes[cursor].key.clone());
            cursor = self.nodes[cursor].next;
        }
        keys
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;

        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_evicts_tail() {
        let mut lru = Lru::new(2);
        assert_eq!(lru.put("a", 1), None);
        assert_eq!(lru.put("b", 2), None);
        assert_eq!(lru.put("c", 3), Some("a"));
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.keys_by_recency(), vec!["c", "b"]);
    }

    #[test]
    fn test_get_moves_to_front() {
        let mut lru = Lru::new(3);
        lru.put("a", 1);
        lru.put("b", 2);
        lru.put("c", 3);
        assert_eq!(lru.get(&"a"), Some(&1));
        assert_eq!(lru.keys_by_recency(), vec!["a", "c", "b"]);
        assert_eq!(lru.put("d", 4), Some("b"));
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let mut lru = Lru::new(2);
        lru.put("a", 1);
        lru.put("b", 2);
        assert_eq!(lru.put("a", 10), None);
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.get(&"a"), Some(&10));
        assert_eq!(lru.keys_by_recency(), vec!["a", "b"]);
    }

    #[test]
    fn test_update_skips_missing_keys() {
        let mut lru = Lru::new(2);
        lru.put("a", 1);
        lru.put("b", 2);
        assert!(!lru.update(&"c", 3));
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.keys_by_recency(), vec!["b", "a"]);

        assert!(lru.update(&"a", 10));
        assert_eq!(lru.keys_by_recency(), vec!["a", "b"]);
        assert_eq!(lru.get(&"a"), Some(&10));
    }

    #[test]
    fn test_capacity_one() {
        let mut lru = Lru::new(1);
        lru.put("a", 1);
        assert_eq!(lru.put("b", 2), Some("a"));
        assert_eq!(lru.get(&"a"), None);
        assert_eq!(lru.get(&"b"), Some(&2));
        assert_eq!(lru.keys_by_recency(), vec!["b"]);
    }

    #[test]
    fn test_iter_does_not_touch_recency() {
        let mut lru = Lru::new(3);
        lru.put("a", 1);
        lru.put("b", 2);
        let seen: usize = lru.iter().count();
        assert_eq!(seen, 2);
        assert_eq!(lru.keys_by_recency(), vec!["b", "a"]);
    }
}
