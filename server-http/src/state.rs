use catalog::domain::StoreConfig;
use catalog::planes::control::{BackgroundWriter, CacheMetrics, WriteBackConfig};
use catalog::planes::data::{
    CacheTtls, CachedCatalogRepository, CatalogCache, CatalogService, CatalogStores,
};
use catalog::ports::{CatalogRepository, StorageFactory};
use shared::config::{Config, StoreSettings};
use shared::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub cache: Arc<CatalogCache>,
    pub metrics: Arc<CacheMetrics>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Runs `call` under the per-request deadline.
    pub async fn with_deadline<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| Error::DeadlineExceeded)?
    }
}

/// Everything `main` needs to serve requests and shut down cleanly.
pub struct Bootstrap {
    pub state: AppState,
    pub writer: Arc<BackgroundWriter>,
}

/// Wires one fast store per entity type, the write-back pool and the
/// cache-aside layer in front of `source`. Must run inside a tokio runtime.
pub fn bootstrap(
    config: &Config,
    source: Arc<dyn CatalogRepository>,
    factory: &dyn StorageFactory,
) -> Bootstrap {
    let store = |settings: &StoreSettings| factory.create_from_config(&StoreConfig::from(settings));
    let stores = CatalogStores {
        cinemas: store(&config.cache.cinemas),
        cities_cinemas: store(&config.cache.cities_cinemas),
        cities: store(&config.cache.cities),
        halls: store(&config.cache.halls),
        halls_configurations: store(&config.cache.halls_configurations),
    };

    let cache = Arc::new(CatalogCache::new(stores));
    let metrics = Arc::new(CacheMetrics::new());
    let writer = Arc::new(BackgroundWriter::start(WriteBackConfig::from(
        &config.write_back,
    )));

    let repository = Arc::new(CachedCatalogRepository::new(
        source,
        cache.clone(),
        CacheTtls::from(&config.cache),
        metrics.clone(),
        writer.clone(),
    ));

    Bootstrap {
        state: AppState {
            catalog: Arc::new(CatalogService::new(repository)),
            cache,
            metrics,
            request_timeout: config.request_timeout.as_duration(),
        },
        writer,
    }
}
