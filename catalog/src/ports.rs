#![deny(clippy::all)]

use crate::domain::{
    Cinema, City, CityScreening, Hall, MoviesScreenings, Period, Place, Screening, StoreConfig,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use shared::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// Ports are the pluggable extension points for the fast stores, the durable
// store and the observability collaborators.

/// Port for creating fast-store instances from configuration
pub trait StorageFactory: Send + Sync + 'static {
    fn create_from_config(&self, config: &StoreConfig) -> Arc<dyn StoreClient>;
}

/// Port for a single key-value fast store (one per cached entity type).
///
/// `get` returns `Ok(None)` when the key is absent or expired; an `Err` means
/// the store itself could not answer.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;
    /// One slot per requested key, in request order.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>>;
    /// Keys matching a glob pattern where `*` matches any run of characters.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn ping(&self) -> Result<()>;
}

/// The read contract of the catalog.
///
/// Implemented by the durable store adapter and by the cache-aside
/// orchestrator, so callers cannot tell which one they talk to.
/// Single-record lookups report missing rows as `Error::NotFound`;
/// list queries return an empty list.
#[async_trait]
pub trait CatalogRepository: Send + Sync + 'static {
    async fn get_cinema(&self, id: i32) -> Result<Cinema>;

    async fn get_cinemas_in_city(&self, city_id: i32) -> Result<Vec<Cinema>>;

    /// All cities that have at least one cinema.
    async fn get_cities(&self) -> Result<Vec<City>>;

    async fn get_hall_configuration(&self, hall_id: i32) -> Result<Vec<Place>>;

    /// Halls with the given ids, without their configuration. Order is unspecified.
    async fn get_halls(&self, ids: &[i32]) -> Result<Vec<Hall>>;

    async fn get_screening(&self, id: i64) -> Result<Screening>;

    async fn get_screenings(
        &self,
        cinema_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<Screening>>;

    async fn get_city_screenings(
        &self,
        city_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<CityScreening>>;

    async fn get_movies_screenings(
        &self,
        cinema_id: i32,
        period: Period,
    ) -> Result<Vec<MoviesScreenings>>;

    async fn get_all_movies_screenings(&self, period: Period) -> Result<Vec<MoviesScreenings>>;

    async fn get_movies_screenings_in_cities(
        &self,
        cities_ids: &[i32],
        period: Period,
    ) -> Result<Vec<MoviesScreenings>>;

    async fn ping(&self) -> Result<()>;
}

/// Receives cache hit/miss counts per logical operation.
pub trait MetricsSink: Send + Sync + 'static {
    fn inc_hits(&self, operation: &'static str, count: u64);
    fn inc_misses(&self, operation: &'static str, count: u64);
}

/// A detached cache write produced by a read that missed the cache.
pub struct WriteBack {
    pub operation: &'static str,
    task: BoxFuture<'static, Result<()>>,
}

impl WriteBack {
    pub fn new<F>(operation: &'static str, task: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            operation,
            task: Box::pin(task),
        }
    }

    pub async fn run(self) -> Result<()> {
        self.task.await
    }
}

impl std::fmt::Debug for WriteBack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBack")
            .field("operation", &self.operation)
            .finish()
    }
}

/// Accepts write-backs without making the caller wait for them.
pub trait WriteBackScheduler: Send + Sync + 'static {
    fn schedule(&self, job: WriteBack);
}
