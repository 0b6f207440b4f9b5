//! Memo for secondary lookups
//!
//! One `OnceCell` per key: concurrent callers asking for the same key wait
//! on a single fetch, and a failed fetch leaves the cell empty so a later
//! call retries it. Entries are never evicted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

pub struct LookupCache<V> {
    cells: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
}

impl<V: Clone> LookupCache<V> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key`, running `fetch` on a miss
    ///
    /// Errors are returned to the caller and not stored.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(key.to_string()).or_default())
        };

        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Cached value without fetching
    pub async fn get(&self, key: &str) -> Option<V> {
        let cells = self.cells.lock().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Number of keys holding a value
    pub async fn len(&self) -> usize {
        let cells = self.cells.lock().await;
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone> Default for LookupCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_value_is_memoized() {
        let cache = LookupCache::<bool>::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("acme/widget", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(true)
                })
                .await
                .unwrap();
            assert!(value);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("acme/widget").await, Some(true));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = LookupCache::<bool>::new();

        let first = cache.get_or_fetch("k", || async { Err::<bool, _>("boom") }).await;
        assert_eq!(first, Err("boom"));
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);

        let second = cache.get_or_fetch("k", || async { Ok::<_, &str>(false) }).await;
        assert_eq!(second, Ok(false));
        assert_eq!(cache.get("k").await, Some(false));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = Arc::new(LookupCache::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ()>(7)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
