//! Keyed map with per-entry last-touched timestamps and idle eviction.
//!
//! Backs the session store and the game store. Entries idle for longer than the
//! TTL are invisible to readers immediately and physically removed by
//! [`ExpiringMap::sweep_expired`], which the background sweeper calls periodically.

use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    touched: Instant,
}

#[derive(Clone, Debug)]
pub struct ExpiringMap<K, V> {
    idle_ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            entries: HashMap::new(),
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut_at(key, Instant::now())
    }

    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.put_at(key, value, Instant::now())
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_at(key, Instant::now())
    }

    pub fn sweep_expired(&mut self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Read and refresh an entry. An expired entry is dropped and reported absent.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&V> {
        self.get_mut_at(key, now).map(|v| &*v)
    }

    pub fn get_mut_at(&mut self, key: &K, now: Instant) -> Option<&mut V> {
        if self.is_expired(key, now) {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.touched = now;
        Some(&mut entry.value)
    }

    /// Insert or replace. Returns the previous live value, if any.
    pub fn put_at(&mut self, key: K, value: V, now: Instant) -> Option<V> {
        let prev = self.entries.insert(
            key,
            Entry {
                value,
                touched: now,
            },
        )?;
        if self.expired(&prev, now) {
            return None;
        }
        Some(prev.value)
    }

    /// Remove an entry. An entry that had already expired is removed but not returned.
    pub fn remove_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let prev = self.entries.remove(key)?;
        if self.expired(&prev, now) {
            return None;
        }
        Some(prev.value)
    }

    /// Drop every entry idle for longer than the TTL. Returns the number evicted.
    pub fn sweep_expired_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.idle_ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.touched) <= ttl);
        before - self.entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, key: &K, now: Instant) -> bool {
        self.entries
            .get(key)
            .map(|e| self.expired(e, now))
            .unwrap_or(false)
    }

    fn expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.touched) > self.idle_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_refresh_the_idle_clock() {
        let start = Instant::now();
        let mut map = ExpiringMap::new(Duration::from_secs(10));
        map.put_at("a", 1, start);

        assert_eq!(map.get_at(&"a", start + Duration::from_secs(8)), Some(&1));
        // Touched at +8s, so still alive at +16s.
        assert_eq!(map.get_at(&"a", start + Duration::from_secs(16)), Some(&1));
    }

    #[test]
    fn expired_entries_are_invisible_before_sweep() {
        let start = Instant::now();
        let mut map = ExpiringMap::new(Duration::from_secs(10));
        map.put_at("a", 1, start);

        assert_eq!(map.get_at(&"a", start + Duration::from_secs(11)), None);
        assert!(map.is_empty());
    }

    #[test]
    fn sweep_evicts_only_idle_entries() {
        let start = Instant::now();
        let mut map = ExpiringMap::new(Duration::from_secs(10));
        map.put_at("old", 1, start);
        map.put_at("fresh", 2, start + Duration::from_secs(9));

        let evicted = map.sweep_expired_at(start + Duration::from_secs(12));
        assert_eq!(evicted, 1);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_at(&"fresh", start + Duration::from_secs(12)), Some(&2));
    }

    #[test]
    fn put_and_remove_ignore_expired_previous_values() {
        let start = Instant::now();
        let mut map = ExpiringMap::new(Duration::from_secs(5));
        map.put_at("k", 1, start);

        assert_eq!(map.put_at("k", 2, start + Duration::from_secs(6)), None);
        assert_eq!(map.put_at("k", 3, start + Duration::from_secs(7)), Some(2));
        assert_eq!(map.remove_at(&"k", start + Duration::from_secs(20)), None);
        assert!(map.is_empty());
    }
}
