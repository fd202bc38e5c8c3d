//! Content-addressed embedding cache
//!
//! Keyed by Sha256(model_id || composed text), so a cache hit is only
//! possible for the exact same model and input. Writes are compare-and-set:
//! the first writer wins and later writers for the same key are no-ops.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use sha2::Digest;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;

/// Content hash of (model id, composed text).
pub fn content_key(model_id: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct CacheInner {
    entries: HashMap<String, Arc<Vec<f32>>>,
    insertion_order: VecDeque<String>,
}

/// Bounded in-memory vector cache.
pub struct EmbeddingCache {
    inner: RwLock<CacheInner>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        let inner = self.inner.read().await;
        inner.entries.get(key).cloned()
    }

    /// Insert unless the key is already present. Returns the stored vector,
    /// which is the existing one when a concurrent writer got there first.
    pub async fn insert_if_absent(&self, key: String, vector: Vec<f32>) -> Arc<Vec<f32>> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.entries.get(&key) {
            return existing.clone();
        }

        while inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.insertion_order.pop_front() {
                inner.entries.remove(&oldest);
                debug!("Evicted embedding cache entry {}", oldest);
            } else {
                break;
            }
        }

        let stored = Arc::new(vector);
        inner.entries.insert(key.clone(), stored.clone());
        inner.insertion_order.push_back(key);
        stored
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_depends_on_model_and_text() {
        let a = content_key("model-a", "some text");
        let b = content_key("model-b", "some text");
        let c = content_key("model-a", "other text");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, content_key("model-a", "some text"));
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_write() {
        let cache = EmbeddingCache::new(10);
        let key = content_key("m", "t");

        let first = cache.insert_if_absent(key.clone(), vec![1.0]).await;
        let second = cache.insert_if_absent(key.clone(), vec![2.0]).await;

        assert_eq!(*first, vec![1.0]);
        assert_eq!(*second, vec![1.0]);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_evicts_oldest_at_capacity() {
        let cache = EmbeddingCache::new(2);
        cache.insert_if_absent("a".to_string(), vec![1.0]).await;
        cache.insert_if_absent("b".to_string(), vec![2.0]).await;
        cache.insert_if_absent("c".to_string(), vec![3.0]).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
