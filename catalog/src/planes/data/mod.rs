pub mod cached_repository;
pub mod catalog_cache;
pub mod catalog_service;

pub use cached_repository::{CacheTtls, CachedCatalogRepository};
pub use catalog_cache::{CatalogCache, CatalogStores, HallsLookup, Lookup, MissReason};
pub use catalog_service::CatalogService;
