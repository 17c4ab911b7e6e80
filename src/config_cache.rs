use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Error;
use crate::error::Result;

/// Source of a configuration document for a cache
///
/// Implementations perform the network round trips; the cache decides when
/// they run.
#[async_trait]
pub trait ConfigFetcher<T>: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<T>;
}

struct CacheEntry<T> {
    value: Arc<T>,
    fetched_at: Instant,
    refresh_after: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: Arc<T>, ttl: Duration) -> Self {
        let fetched_at = Instant::now();
        Self {
            value,
            fetched_at,
            refresh_after: fetched_at + ttl,
        }
    }

    fn is_due(&self) -> bool {
        Instant::now() >= self.refresh_after
    }
}

/// Lazily refreshed configuration value for one URL
///
/// Serves the cached value until its validity window expires, then refreshes
/// it on the next `get`. Only one refresh runs at a time: callers arriving
/// while a refresh is in flight wait for it and receive its result. A failed
/// refresh keeps serving the previous value and backs off for the retry
/// interval; it is only an error when nothing was ever fetched.
pub struct RefreshingConfigCache<T> {
    url: String,
    fetcher: Arc<dyn ConfigFetcher<T>>,
    refresh_interval: Duration,
    retry_interval: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
    refresh_lock: Mutex<()>,
}

impl<T: Send + Sync + 'static> RefreshingConfigCache<T> {
    pub fn new(
        url: impl Into<String>,
        fetcher: Arc<dyn ConfigFetcher<T>>,
        refresh_interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            fetcher,
            refresh_interval,
            retry_interval,
            entry: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the current value, fetching it if absent or expired
    ///
    /// # Errors
    /// Returns `Error::ConfigurationUnavailable` when the fetch fails and no
    /// value has ever been cached.
    pub async fn get(&self) -> Result<Arc<T>> {
        if let Some(value) = self.try_get_cached().await {
            return Ok(value);
        }

        let _refreshing = self.refresh_lock.lock().await;

        // Whoever held the lock before us may have refreshed already
        if let Some(value) = self.try_get_cached().await {
            return Ok(value);
        }

        self.refresh_locked().await
    }

    /// Force a refresh regardless of the validity window
    pub async fn refresh(&self) -> Result<Arc<T>> {
        let _refreshing = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Make the next `get` refresh, but no sooner than the retry interval
    /// after the last fetch
    pub async fn request_refresh(&self) {
        let mut entry = self.entry.write().await;
        if let Some(entry) = entry.as_mut() {
            let earliest = (entry.fetched_at + self.retry_interval).max(Instant::now());
            entry.refresh_after = entry.refresh_after.min(earliest);
            tracing::debug!(target: "connector_auth.cache", url = %self.url, "Refresh requested");
        }
    }

    /// When the cached value was fetched, `None` before the first success
    pub async fn fetched_at(&self) -> Option<Instant> {
        self.entry.read().await.as_ref().map(|entry| entry.fetched_at)
    }

    /// Try to get the value from cache if present and not due for refresh
    async fn try_get_cached(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().await;
        let cached = entry.as_ref()?;

        if cached.is_due() {
            return None;
        }

        Some(Arc::clone(&cached.value))
    }

    /// Fetch and store a new value. Callers must hold `refresh_lock`.
    async fn refresh_locked(&self) -> Result<Arc<T>> {
        tracing::debug!(
            target: "connector_auth.cache",
            url = %self.url,
            "Refreshing configuration"
        );

        match self.fetcher.fetch(&self.url).await {
            Ok(value) => {
                let value = Arc::new(value);
                let mut entry = self.entry.write().await;
                *entry = Some(CacheEntry::new(Arc::clone(&value), self.refresh_interval));

                tracing::info!(
                    target: "connector_auth.cache",
                    url = %self.url,
                    "Configuration refreshed"
                );
                Ok(value)
            }
            Err(error) => {
                let mut entry = self.entry.write().await;
                match entry.as_mut() {
                    Some(stale) => {
                        stale.refresh_after = Instant::now() + self.retry_interval;
                        tracing::warn!(
                            target: "connector_auth.cache",
                            url = %self.url,
                            error = %error,
                            age_secs = stale.fetched_at.elapsed().as_secs(),
                            "Configuration refresh failed, serving stale configuration"
                        );
                        Ok(Arc::clone(&stale.value))
                    }
                    None => {
                        tracing::error!(
                            target: "connector_auth.cache",
                            url = %self.url,
                            error = %error,
                            "Configuration fetch failed and nothing is cached"
                        );
                        Err(Error::ConfigurationUnavailable {
                            url: self.url.clone(),
                            source: Box::new(error),
                        })
                    }
                }
            }
        }
    }
}
