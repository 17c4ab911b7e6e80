use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::config_cache::ConfigFetcher;
use crate::config_cache::RefreshingConfigCache;
use crate::endorsements::EndorsementFetcher;
use crate::endorsements::EndorsementMap;
use crate::signing::SigningConfig;
use crate::signing::SigningConfigFetcher;

type CacheMap<T> = Mutex<HashMap<String, Arc<RefreshingConfigCache<T>>>>;

/// Shared caches keyed by discovery document URL
///
/// Every validator built from the same registry and pointed at the same
/// discovery URL uses the same two cache instances, so the provider sees one
/// stream of discovery traffic no matter how many validators exist. Entries
/// live as long as the registry.
pub struct ConfigCacheRegistry {
    config: CacheConfig,
    signing_fetcher: Arc<dyn ConfigFetcher<SigningConfig>>,
    endorsement_fetcher: Arc<dyn ConfigFetcher<EndorsementMap>>,
    signing: CacheMap<SigningConfig>,
    endorsements: CacheMap<EndorsementMap>,
}

impl Default for ConfigCacheRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ConfigCacheRegistry {
    /// Create a registry fetching over HTTP
    pub fn new(config: CacheConfig) -> Self {
        let client = config.http_client.clone().unwrap_or_default();

        Self::with_fetchers(
            config,
            Arc::new(SigningConfigFetcher::new(client.clone())),
            Arc::new(EndorsementFetcher::new(client)),
        )
    }

    /// Create a registry with custom fetchers
    pub fn with_fetchers(
        config: CacheConfig,
        signing_fetcher: Arc<dyn ConfigFetcher<SigningConfig>>,
        endorsement_fetcher: Arc<dyn ConfigFetcher<EndorsementMap>>,
    ) -> Self {
        Self {
            config,
            signing_fetcher,
            endorsement_fetcher,
            signing: Mutex::new(HashMap::new()),
            endorsements: Mutex::new(HashMap::new()),
        }
    }

    /// Get the signing configuration cache for `url`, creating it on first use
    pub async fn signing_cache(&self, url: &str) -> Arc<RefreshingConfigCache<SigningConfig>> {
        get_or_create(&self.signing, url, &self.signing_fetcher, &self.config).await
    }

    /// Get the endorsement cache for `url`, creating it on first use
    pub async fn endorsement_cache(
        &self,
        url: &str,
    ) -> Arc<RefreshingConfigCache<EndorsementMap>> {
        get_or_create(&self.endorsements, url, &self.endorsement_fetcher, &self.config).await
    }
}

async fn get_or_create<T: Send + Sync + 'static>(
    caches: &CacheMap<T>,
    url: &str,
    fetcher: &Arc<dyn ConfigFetcher<T>>,
    config: &CacheConfig,
) -> Arc<RefreshingConfigCache<T>> {
    let mut caches = caches.lock().await;

    let cache = caches.entry(url.to_string()).or_insert_with(|| {
        tracing::debug!(
            target: "connector_auth.registry",
            url = %url,
            "Creating configuration cache"
        );
        Arc::new(RefreshingConfigCache::new(
            url,
            Arc::clone(fetcher),
            config.refresh_interval,
            config.retry_interval,
        ))
    });

    Arc::clone(cache)
}
