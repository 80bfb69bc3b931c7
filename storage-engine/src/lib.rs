pub mod moka_store;
pub mod sled_repository;

use catalog::domain::StoreConfig;
use catalog::ports::{StorageFactory, StoreClient};
use std::sync::Arc;
use tracing::debug;

pub use moka_store::MokaStore;
pub use sled_repository::{CatalogSeed, SledCatalogRepository, load_seed};

/// Builds one isolated moka store per configured entity type.
#[derive(Debug, Default, Clone, Copy)]
pub struct MokaStoreFactory;

impl StorageFactory for MokaStoreFactory {
    fn create_from_config(&self, config: &StoreConfig) -> Arc<dyn StoreClient> {
        debug!(
            store = %config.name,
            max_entries = ?config.max_entries,
            default_ttl = ?config.default_ttl,
            "creating moka store"
        );
        Arc::new(MokaStore::new(config))
    }
}
