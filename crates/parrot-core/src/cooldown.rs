//! Bounded cooldown cache.
//!
//! Maps a key (nick, url, …) to the last time the guarded action happened.
//! When the cache is full the least recently inserted key is evicted, which
//! simply resets that key's cooldown. This is a throttle, not a ledger.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RateLimitCache {
    last_used: HashMap<String, DateTime<Utc>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    capacity: usize,
    timeout: Duration,
}

impl RateLimitCache {
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            last_used: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.last_used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_used.is_empty()
    }

    /// Time left before `key` may act again, if it is cooling down.
    pub fn remaining(&self, key: &str, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_used.get(key)?;
        let elapsed = (now - *last).to_std().unwrap_or_default();
        self.timeout.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    /// Whether `key` is still inside its cooldown window.
    pub fn is_cooling(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.remaining(key, now).is_some()
    }

    /// Record that `key` acted at `now`.
    pub fn touch(&mut self, key: &str, now: DateTime<Utc>) {
        if self.last_used.insert(key.to_string(), now).is_some() {
            self.order.retain(|k| k != key);
        }
        self.order.push_back(key.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.last_used.remove(&oldest);
                tracing::debug!("cooldown cache evicted '{oldest}'");
            }
        }
    }

    /// Check and record in one step. Returns `false` while cooling down.
    pub fn try_acquire(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        if self.is_cooling(key, now) {
            return false;
        }
        self.touch(key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_cooldown_window() {
        let mut cache = RateLimitCache::new(20, Duration::from_secs(60));
        assert!(cache.try_acquire("x", at(0)));
        assert!(!cache.try_acquire("x", at(30)));
        assert!(cache.try_acquire("x", at(61)));
    }

    #[test]
    fn test_rejected_attempt_does_not_extend_window() {
        let mut cache = RateLimitCache::new(20, Duration::from_secs(60));
        assert!(cache.try_acquire("x", at(0)));
        assert!(!cache.try_acquire("x", at(59)));
        assert!(cache.try_acquire("x", at(60)));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut cache = RateLimitCache::new(20, Duration::from_secs(60));
        assert!(cache.try_acquire("x", at(0)));
        assert!(cache.try_acquire("y", at(1)));
        assert_eq!(cache.remaining("x", at(10)), Some(Duration::from_secs(50)));
        assert_eq!(cache.remaining("z", at(10)), None);
    }

    #[test]
    fn test_eviction_resets_oldest_key() {
        let mut cache = RateLimitCache::new(2, Duration::from_secs(60));
        cache.touch("a", at(0));
        cache.touch("b", at(1));
        cache.touch("c", at(2));
        assert_eq!(cache.len(), 2);
        // "a" was evicted, so it may act again immediately.
        assert!(!cache.is_cooling("a", at(3)));
        assert!(cache.is_cooling("b", at(3)));
        assert!(cache.is_cooling("c", at(3)));
    }

    #[test]
    fn test_retouch_moves_key_to_back() {
        let mut cache = RateLimitCache::new(2, Duration::from_secs(60));
        cache.touch("a", at(0));
        cache.touch("b", at(1));
        cache.touch("a", at(2));
        cache.touch("c", at(3));
        assert!(cache.is_cooling("a", at(4)));
        assert!(!cache.is_cooling("b", at(4)));
    }
}
