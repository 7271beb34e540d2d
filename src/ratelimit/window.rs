//! Bounded per-endpoint window storage.

use std::collections::HashMap;

use tracing::debug;

/// The tracked request timestamps for one client key.
///
/// Timestamps are integer milliseconds since the Unix epoch, kept in
/// insertion (and therefore chronological) order. Each entry carries an
/// expiry one policy interval past its last write; an expired entry is
/// indistinguishable from an absent one.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    /// Admitted request timestamps within the current window
    timestamps: Vec<i64>,
    /// Epoch milliseconds past which this entry is treated as absent
    expires_at: i64,
    /// Logical clock value of the last access, for LRU ordering
    last_used: u64,
}

impl WindowEntry {
    /// The timestamps currently tracked for this entry.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }
}

/// A bounded map of client key to [`WindowEntry`] for one endpoint.
///
/// The store enforces two bounds:
/// - per-entry expiry, applied lazily on [`WindowStore::get`] — no
///   background sweeper is required;
/// - a capacity on the number of distinct client keys, applied on
///   [`WindowStore::set`] by evicting the least-recently-used key before a
///   new one is inserted.
///
/// LRU order is maintained with a logical clock bumped on every get and set,
/// so a read keeps an entry warm.
#[derive(Debug, Default)]
pub struct WindowStore {
    entries: HashMap<String, WindowEntry>,
    /// Monotonic access counter backing the LRU order
    clock: u64,
}

impl WindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for a client key.
    ///
    /// An entry whose expiry has elapsed is removed and reported as absent.
    pub fn get(&mut self, client_key: &str, now_ms: i64) -> Option<&WindowEntry> {
        if let Some(entry) = self.entries.get(client_key) {
            if entry.expires_at <= now_ms {
                self.entries.remove(client_key);
                return None;
            }
        }

        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(client_key).map(|entry| {
            entry.last_used = clock;
            &*entry
        })
    }

    /// Insert or replace the entry for a client key.
    ///
    /// The entry's expiry is set to `interval_ms` past `now_ms`. When the
    /// insert would grow the store past `capacity` distinct keys, the
    /// least-recently-used key is evicted first.
    pub fn set(
        &mut self,
        client_key: &str,
        timestamps: Vec<i64>,
        now_ms: i64,
        interval_ms: i64,
        capacity: usize,
    ) {
        if !self.entries.contains_key(client_key) && self.entries.len() >= capacity {
            self.evict_lru();
        }

        self.clock += 1;
        self.entries.insert(
            client_key.to_string(),
            WindowEntry {
                timestamps,
                expires_at: now_ms + interval_ms,
                last_used: self.clock,
            },
        );
    }

    /// Remove the entry for a client key, if present.
    pub fn delete(&mut self, client_key: &str) {
        self.entries.remove(client_key);
    }

    /// The number of distinct client keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store tracks no client keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict the least-recently-used entry.
    fn evict_lru(&mut self) {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            debug!(client_key = %key, "Evicting least-recently-used window entry");
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: i64 = 60_000;

    #[test]
    fn test_get_on_empty_store() {
        let mut store = WindowStore::new();
        assert!(store.get("1.1.1.1", 0).is_none());
    }

    #[test]
    fn test_set_then_get() {
        let mut store = WindowStore::new();
        store.set("1.1.1.1", vec![10, 20], 20, INTERVAL, 10);

        let entry = store.get("1.1.1.1", 30).unwrap();
        assert_eq!(entry.timestamps(), &[10, 20]);
    }

    #[test]
    fn test_expired_entry_treated_as_absent() {
        let mut store = WindowStore::new();
        store.set("1.1.1.1", vec![0], 0, INTERVAL, 10);

        // Just before expiry the entry is still there.
        assert!(store.get("1.1.1.1", INTERVAL - 1).is_some());
        // At expiry it is gone, and removed from the map.
        store.set("1.1.1.1", vec![0], 0, INTERVAL, 10);
        assert!(store.get("1.1.1.1", INTERVAL).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_set_refreshes_expiry() {
        let mut store = WindowStore::new();
        store.set("1.1.1.1", vec![0], 0, INTERVAL, 10);
        store.set("1.1.1.1", vec![0, 50_000], 50_000, INTERVAL, 10);

        // Expiry now runs from the second set.
        assert!(store.get("1.1.1.1", INTERVAL + 1).is_some());
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let mut store = WindowStore::new();
        store.set("a", vec![1], 1, INTERVAL, 2);
        store.set("b", vec![2], 2, INTERVAL, 2);

        // Touch "a" so "b" becomes the LRU key.
        store.get("a", 3);

        store.set("c", vec![4], 4, INTERVAL, 2);
        assert_eq!(store.len(), 2);
        assert!(store.get("a", 5).is_some());
        assert!(store.get("b", 5).is_none());
        assert!(store.get("c", 5).is_some());
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let mut store = WindowStore::new();
        store.set("a", vec![1], 1, INTERVAL, 2);
        store.set("b", vec![2], 2, INTERVAL, 2);
        store.set("a", vec![1, 3], 3, INTERVAL, 2);

        assert_eq!(store.len(), 2);
        assert!(store.get("b", 4).is_some());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = WindowStore::new();
        store.set("a", vec![1], 1, INTERVAL, 2);

        store.delete("a");
        assert!(store.get("a", 2).is_none());
        // Deleting a missing key is a no-op.
        store.delete("a");
        assert!(store.is_empty());
    }
}
