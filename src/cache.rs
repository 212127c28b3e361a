//! Time-bounded response cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// A small map whose entries expire after a fixed time-to-live.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a fresh entry, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    /// Stores a value, replacing any previous entry and dropping expired
    /// ones.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("categories", vec!["books".to_string()]).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&"categories").await, Some(vec!["books".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_miss_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "value").await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&1).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_evicts_expired() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("old", 1).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert("new", 2).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("a", 1).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
