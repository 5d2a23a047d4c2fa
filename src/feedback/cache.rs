//! Materialized "all records enhanced" view
//!
//! Population is single-flight: the check, the full store read, the
//! per-record enhancement and the publish all happen under one async mutex,
//! so concurrent readers of an empty cache wait for the first one and then
//! share its list. There is no partial update; `invalidate` drops
//! everything and the next read rebuilds from the store.
//!
//! The store is synchronous file IO, so the scan runs on the blocking pool
//! while the async lock stays held.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{FeedbackError, Result};
use crate::feedback::enhance::FeedbackEnhancer;
use crate::store::FeedbackSource;
use crate::types::EnhancedFeedback;

enum CacheState {
    Empty,
    Populated(Arc<Vec<EnhancedFeedback>>),
}

/// Process-wide cache of enhanced feedback
pub struct EnhancedCache {
    source: Arc<dyn FeedbackSource>,
    enhancer: Arc<dyn FeedbackEnhancer>,
    state: Mutex<CacheState>,
}

impl EnhancedCache {
    pub fn new(source: Arc<dyn FeedbackSource>, enhancer: Arc<dyn FeedbackEnhancer>) -> Self {
        Self {
            source,
            enhancer,
            state: Mutex::new(CacheState::Empty),
        }
    }

    /// The enhanced view, building it first if the cache is empty.
    ///
    /// Fails only when the store cannot be read (or an enhancer reports an
    /// error); the cache stays empty in that case.
    pub async fn get_enhanced(&self) -> Result<Arc<Vec<EnhancedFeedback>>> {
        let mut state = self.state.lock().await;

        if let CacheState::Populated(list) = &*state {
            debug!("Serving {} enhanced entries from cache", list.len());
            return Ok(list.clone());
        }

        let source = self.source.clone();
        let entries = tokio::task::spawn_blocking(move || source.scan_all())
            .await
            .map_err(|e| FeedbackError::Io(std::io::Error::other(e)))??;
        info!("Building enhanced feedback cache from {} entries", entries.len());

        let mut enhanced = Vec::with_capacity(entries.len());
        for entry in entries {
            enhanced.push(self.enhancer.enhance(entry).await?);
        }

        let list = Arc::new(enhanced);
        *state = CacheState::Populated(list.clone());
        Ok(list)
    }

    /// Reset to empty; the next read rebuilds from the store
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = CacheState::Empty;
        info!("Enhanced feedback cache cleared");
    }

    pub async fn is_populated(&self) -> bool {
        matches!(&*self.state.lock().await, CacheState::Populated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FeedbackStore;
    use crate::types::FeedbackEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEnhancer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedbackEnhancer for CountingEnhancer {
        async fn enhance(&self, entry: FeedbackEntry) -> Result<EnhancedFeedback> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(EnhancedFeedback::new(entry, "Other", format!("call {}", n)))
        }
    }

    fn seeded_store(dir: &tempfile::TempDir) -> Arc<FeedbackStore> {
        let store = Arc::new(FeedbackStore::new(dir.path().join("feedback.txt")));
        store.save(FeedbackEntry::new("Alice", "Electronics", "Great service")).unwrap();
        store.save(FeedbackEntry::new("Bob", "Grocery", "Slow checkout")).unwrap();
        store
    }

    #[tokio::test]
    async fn test_repeated_reads_return_same_list() {
        let dir = tempfile::tempdir().unwrap();
        let enhancer = Arc::new(CountingEnhancer::default());
        let cache = EnhancedCache::new(seeded_store(&dir), enhancer.clone());

        assert!(!cache.is_populated().await);
        let first = cache.get_enhanced().await.unwrap();
        let second = cache.get_enhanced().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(enhancer.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_populated().await);
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir);
        let enhancer = Arc::new(CountingEnhancer::default());
        let cache = EnhancedCache::new(store.clone(), enhancer.clone());

        cache.get_enhanced().await.unwrap();
        store.save(FeedbackEntry::new("Carol", "Bakery", "Fresh bread")).unwrap();

        // Writes are not visible until invalidated
        assert_eq!(cache.get_enhanced().await.unwrap().len(), 2);

        cache.invalidate().await;
        let rebuilt = cache.get_enhanced().await.unwrap();
        assert_eq!(rebuilt.len(), 3);
        assert_eq!(enhancer.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_unreadable_store_leaves_cache_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FeedbackStore::new(dir.path()));
        let cache = EnhancedCache::new(store, Arc::new(CountingEnhancer::default()));

        assert!(matches!(cache.get_enhanced().await, Err(FeedbackError::Io(_))));
        assert!(!cache.is_populated().await);
    }
}
