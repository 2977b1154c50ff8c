use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error_handling::types::CacheError;

/// Interval of the background expiry sweep.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

struct Item<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Item<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Store<V> = Mutex<HashMap<String, Item<V>>>;

/// In-memory key/value store whose entries expire after a TTL.
///
/// Expired entries are never returned. They are removed lazily on read and by
/// an optional background sweep started with [`TtlCache::with_cleanup`].
pub struct TtlCache<V> {
    items: Arc<Store<V>>,
    default_ttl: Duration,
    cleanup: Option<JoinHandle<()>>,
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            items: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            cleanup: None,
        }
    }

    /// Same as [`TtlCache::new`] plus a sweep every `interval`, running until
    /// the cache is dropped. Must be called inside a tokio runtime.
    pub fn with_cleanup(default_ttl: Duration, interval: Duration) -> Self {
        let mut cache = Self::new(default_ttl);
        let weak = Arc::downgrade(&cache.items);
        cache.cleanup = Some(tokio::spawn(cleanup_loop(weak, interval)));
        cache
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn set(&self, key: impl Into<String>, value: V) -> Result<(), CacheError> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = key.into();
        trace!("cache set {} (ttl {:?})", key, ttl);
        let mut items = self.items.lock().map_err(|_| CacheError::Poisoned)?;
        items.insert(
            key,
            Item {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let mut items = self.items.lock().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();
        match items.get(key) {
            Some(item) if !item.is_expired(now) => Ok(Some(item.value.clone())),
            Some(_) => {
                items.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock().map_err(|_| CacheError::Poisoned)?;
        items.remove(key);
        Ok(())
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn delete_expired(&self) -> Result<usize, CacheError> {
        purge(&self.items)
    }

    pub fn flush(&self) -> Result<(), CacheError> {
        let mut items = self.items.lock().map_err(|_| CacheError::Poisoned)?;
        items.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(task) = self.cleanup.take() {
            task.abort();
        }
    }
}

fn purge<V>(items: &Store<V>) -> Result<usize, CacheError> {
    let mut items = items.lock().map_err(|_| CacheError::Poisoned)?;
    let now = Instant::now();
    let before = items.len();
    items.retain(|_, item| !item.is_expired(now));
    Ok(before - items.len())
}

async fn cleanup_loop<V: Send + 'static>(items: Weak<Store<V>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(items) = items.upgrade() else {
            return;
        };
        match purge(&items) {
            Ok(0) => {}
            Ok(n) => debug!("cache cleanup removed {} expired item(s)", n),
            Err(e) => debug!("cache cleanup skipped: {}", e),
        }
    }
}
