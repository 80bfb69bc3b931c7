use super::catalog_cache::{CatalogCache, HallsLookup, Lookup};
use crate::domain::{Cinema, City, CityScreening, Hall, MoviesScreenings, Period, Place, Screening};
use crate::ports::{CatalogRepository, MetricsSink, WriteBack, WriteBackScheduler};
use async_trait::async_trait;
use shared::Result;
use shared::config::CacheSettings;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const GET_CINEMA: &str = "GetCinema";
const GET_CINEMAS_IN_CITY: &str = "GetCinemasInCity";
const GET_CITIES: &str = "GetCinemasCities";
const GET_HALL_CONFIGURATION: &str = "GetHallConfiguration";
const GET_HALLS: &str = "GetHalls";

/// Lifetime of freshly written entries, per entity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    pub cinemas: Duration,
    pub cities_cinemas: Duration,
    pub cities: Duration,
    pub halls: Duration,
    pub halls_configurations: Duration,
}

impl From<&CacheSettings> for CacheTtls {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            cinemas: settings.cinemas.ttl.as_duration(),
            cities_cinemas: settings.cities_cinemas.ttl.as_duration(),
            cities: settings.cities.ttl.as_duration(),
            halls: settings.halls.ttl.as_duration(),
            halls_configurations: settings.halls_configurations.ttl.as_duration(),
        }
    }
}

/// Cache-aside decorator over a source [`CatalogRepository`].
///
/// Reads try the cache first and fall back to the source on any miss,
/// including an unreachable or corrupted cache. Fresh data is handed to the
/// write-back scheduler and never awaited. Errors only ever come from the source.
pub struct CachedCatalogRepository {
    source: Arc<dyn CatalogRepository>,
    cache: Arc<CatalogCache>,
    ttls: CacheTtls,
    metrics: Arc<dyn MetricsSink>,
    scheduler: Arc<dyn WriteBackScheduler>,
}

impl CachedCatalogRepository {
    pub fn new(
        source: Arc<dyn CatalogRepository>,
        cache: Arc<CatalogCache>,
        ttls: CacheTtls,
        metrics: Arc<dyn MetricsSink>,
        scheduler: Arc<dyn WriteBackScheduler>,
    ) -> Self {
        Self {
            source,
            cache,
            ttls,
            metrics,
            scheduler,
        }
    }

    fn record<T>(&self, operation: &'static str, lookup: Lookup<T>) -> Option<T> {
        match lookup {
            Lookup::Hit(value) => {
                self.metrics.inc_hits(operation, 1);
                debug!(operation, "cache hit");
                Some(value)
            }
            Lookup::Miss(reason) => {
                self.metrics.inc_misses(operation, 1);
                debug!(operation, ?reason, "cache miss");
                None
            }
        }
    }

    fn write_back<F, Fut>(&self, operation: &'static str, write: F)
    where
        F: FnOnce(Arc<CatalogCache>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.scheduler
            .schedule(WriteBack::new(operation, write(self.cache.clone())));
    }
}

#[async_trait]
impl CatalogRepository for CachedCatalogRepository {
    async fn get_cinema(&self, id: i32) -> Result<Cinema> {
        if let Some(cinema) = self.record(GET_CINEMA, self.cache.get_cinema(id).await) {
            return Ok(cinema);
        }

        let cinema = self.source.get_cinema(id).await?;

        let (value, ttl) = (cinema.clone(), self.ttls.cinemas);
        self.write_back(GET_CINEMA, move |cache| async move {
            cache.cache_cinema(&value, ttl).await
        });
        Ok(cinema)
    }

    async fn get_cinemas_in_city(&self, city_id: i32) -> Result<Vec<Cinema>> {
        let cached = self.cache.get_cinemas_in_city(city_id).await;
        if let Some(cinemas) = self.record(GET_CINEMAS_IN_CITY, cached) {
            return Ok(cinemas);
        }

        let cinemas = self.source.get_cinemas_in_city(city_id).await?;
        if cinemas.is_empty() {
            return Ok(cinemas);
        }

        let (value, ttl) = (cinemas.clone(), self.ttls.cities_cinemas);
        self.write_back(GET_CINEMAS_IN_CITY, move |cache| async move {
            cache.cache_cinemas_in_city(city_id, &value, ttl).await
        });
        Ok(cinemas)
    }

    async fn get_cities(&self) -> Result<Vec<City>> {
        if let Some(cities) = self.record(GET_CITIES, self.cache.get_cities().await) {
            return Ok(cities);
        }

        let cities = self.source.get_cities().await?;
        if cities.is_empty() {
            return Ok(cities);
        }

        let (value, ttl) = (cities.clone(), self.ttls.cities);
        self.write_back(GET_CITIES, move |cache| async move {
            cache.cache_cities(&value, ttl).await
        });
        Ok(cities)
    }

    async fn get_hall_configuration(&self, hall_id: i32) -> Result<Vec<Place>> {
        let cached = self.cache.get_hall_configuration(hall_id).await;
        if let Some(places) = self.record(GET_HALL_CONFIGURATION, cached) {
            return Ok(places);
        }

        let places = self.source.get_hall_configuration(hall_id).await?;
        if places.is_empty() {
            return Ok(places);
        }

        let (value, ttl) = (places.clone(), self.ttls.halls_configurations);
        self.write_back(GET_HALL_CONFIGURATION, move |cache| async move {
            cache.cache_hall_configuration(hall_id, &value, ttl).await
        });
        Ok(places)
    }

    /// Only the ids the cache could not resolve reach the source. The result is
    /// source rows followed by cached rows, not the requested order.
    async fn get_halls(&self, ids: &[i32]) -> Result<Vec<Hall>> {
        let ids = unique_ids(ids);
        let HallsLookup { found, missing } = self.cache.get_halls(&ids).await;

        if missing.is_empty() {
            self.metrics.inc_hits(GET_HALLS, found.len() as u64);
            debug!(operation = GET_HALLS, count = found.len(), "cache hit");
            return Ok(found);
        }

        let hits = (ids.len() - missing.len()) as u64;
        if hits > 0 {
            self.metrics.inc_hits(GET_HALLS, hits);
        }
        self.metrics.inc_misses(GET_HALLS, missing.len() as u64);
        debug!(operation = GET_HALLS, hits, misses = missing.len(), "partial cache miss");

        let mut halls = self.source.get_halls(&missing).await?;
        halls.extend(found);
        if halls.is_empty() {
            return Ok(halls);
        }

        let (value, ttl) = (halls.clone(), self.ttls.halls);
        self.write_back(GET_HALLS, move |cache| async move {
            cache.cache_halls(&value, ttl).await
        });
        Ok(halls)
    }

    async fn get_screening(&self, id: i64) -> Result<Screening> {
        self.source.get_screening(id).await
    }

    async fn get_screenings(
        &self,
        cinema_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<Screening>> {
        self.source.get_screenings(cinema_id, movie_id, period).await
    }

    async fn get_city_screenings(
        &self,
        city_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<CityScreening>> {
        self.source
            .get_city_screenings(city_id, movie_id, period)
            .await
    }

    async fn get_movies_screenings(
        &self,
        cinema_id: i32,
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        self.source.get_movies_screenings(cinema_id, period).await
    }

    async fn get_all_movies_screenings(&self, period: Period) -> Result<Vec<MoviesScreenings>> {
        self.source.get_all_movies_screenings(period).await
    }

    async fn get_movies_screenings_in_cities(
        &self,
        cities_ids: &[i32],
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        self.source
            .get_movies_screenings_in_cities(cities_ids, period)
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.source.ping().await
    }
}

fn unique_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::planes::control::CacheMetrics;
    use crate::ports::StoreClient;
    use crate::test_support::{
        MemoryStore, QueuedScheduler, ScriptedRepository, cinema, city, day, hall, place,
        screening, stores_from,
    };
    use bytes::Bytes;
    use shared::Error;

    struct Harness {
        store: Arc<MemoryStore>,
        source: Arc<ScriptedRepository>,
        metrics: Arc<CacheMetrics>,
        scheduler: Arc<QueuedScheduler>,
        repo: CachedCatalogRepository,
    }

    fn ttls() -> CacheTtls {
        CacheTtls {
            cinemas: Duration::from_secs(10),
            cities_cinemas: Duration::from_secs(20),
            cities: Duration::from_secs(30),
            halls: Duration::from_secs(40),
            halls_configurations: Duration::from_secs(50),
        }
    }

    fn harness_with(source: ScriptedRepository, store: MemoryStore) -> Harness {
        let store = Arc::new(store);
        let source = Arc::new(source);
        let metrics = Arc::new(CacheMetrics::new());
        let scheduler = Arc::new(QueuedScheduler::default());
        let cache = Arc::new(CatalogCache::new(stores_from(store.clone())));
        let repo = CachedCatalogRepository::new(
            source.clone(),
            cache,
            ttls(),
            metrics.clone(),
            scheduler.clone(),
        );
        Harness {
            store,
            source,
            metrics,
            scheduler,
            repo,
        }
    }

    fn harness(source: ScriptedRepository) -> Harness {
        harness_with(source, MemoryStore::default())
    }

    fn full_source() -> ScriptedRepository {
        ScriptedRepository::default()
            .with_cinema(cinema(7, "Lux"))
            .with_city_cinemas(1, vec![cinema(7, "Lux"), cinema(8, "Star")])
            .with_cities(vec![city(1, "Moscow"), city(2, "Omsk")])
            .with_hall(hall(1))
            .with_hall(hall(2))
            .with_hall(hall(3))
            .with_configuration(1, vec![place(1, 1), place(1, 2)])
            .with_screening(screening(11, 7, 1, 18))
    }

    fn sorted(mut halls: Vec<Hall>) -> Vec<Hall> {
        halls.sort_by_key(|h| h.id);
        halls
    }

    #[tokio::test]
    async fn test_cinema_miss_fills_cache_after_write_back() {
        let h = harness(full_source());

        let read = h.repo.get_cinema(7).await.unwrap();
        assert_eq!(read, cinema(7, "Lux"));
        assert_eq!(h.metrics.misses(GET_CINEMA), 1);
        assert_eq!(h.scheduler.pending(), 1);

        for result in h.scheduler.run_all().await {
            result.unwrap();
        }
        let cache = CatalogCache::new(stores_from(h.store.clone()));
        assert_eq!(cache.get_cinema(7).await, Lookup::Hit(cinema(7, "Lux")));
        assert_eq!(h.store.ttl_of("cinema:7"), Some(Duration::from_secs(10)));

        let again = h.repo.get_cinema(7).await.unwrap();
        assert_eq!(again, read);
        assert_eq!(h.source.calls("get_cinema"), 1);
        assert_eq!(h.metrics.hits(GET_CINEMA), 1);
    }

    #[tokio::test]
    async fn test_unavailable_cache_is_transparent() {
        let source = full_source();
        let h = harness_with(full_source(), MemoryStore::failing());

        assert_eq!(h.repo.get_cinema(7).await, source.get_cinema(7).await);
        assert_eq!(
            h.repo.get_cinemas_in_city(1).await,
            source.get_cinemas_in_city(1).await
        );
        assert_eq!(h.repo.get_cities().await, source.get_cities().await);
        assert_eq!(
            h.repo.get_hall_configuration(1).await,
            source.get_hall_configuration(1).await
        );
        assert_eq!(
            h.repo.get_halls(&[1, 2, 3]).await,
            source.get_halls(&[1, 2, 3]).await
        );
        assert_eq!(h.repo.get_cinema(99).await, Err(Error::NotFound));

        // Write-backs fail against the dead store but never reach the caller.
        let results = h.scheduler.run_all().await;
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[tokio::test]
    async fn test_not_found_and_empty_results_are_never_cached() {
        let h = harness(ScriptedRepository::default());

        assert_eq!(h.repo.get_cinema(9).await, Err(Error::NotFound));
        assert_eq!(h.repo.get_cinemas_in_city(9).await, Ok(vec![]));
        assert_eq!(h.repo.get_cities().await, Ok(vec![]));
        assert_eq!(h.repo.get_hall_configuration(9).await, Ok(vec![]));
        assert_eq!(h.repo.get_halls(&[9]).await, Ok(vec![]));

        assert_eq!(h.scheduler.pending(), 0);
        h.scheduler.run_all().await;
        assert_eq!(h.store.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_source_error_propagates_and_skips_cache() {
        let h = harness(full_source());
        h.source.fail_with(Error::internal("db down"));

        assert_eq!(h.repo.get_cinema(7).await, Err(Error::internal("db down")));
        assert_eq!(h.repo.get_cities().await, Err(Error::internal("db down")));
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_entry_falls_back_to_source() {
        let h = harness(full_source());
        h.store.insert_raw("cinema:7", Bytes::from_static(b"\xffgarbage"));
        h.store.insert_raw("hall_configuration:1", Bytes::from_static(b"{\"row\":1}"));

        assert_eq!(h.repo.get_cinema(7).await, Ok(cinema(7, "Lux")));
        assert_eq!(
            h.repo.get_hall_configuration(1).await,
            Ok(vec![place(1, 1), place(1, 2)])
        );
        assert_eq!(h.source.calls("get_cinema"), 1);

        h.scheduler.run_all().await;
        let bytes = h.store.get("cinema:7").await.unwrap().unwrap();
        assert_eq!(codec::decode::<Cinema>(&bytes).unwrap(), cinema(7, "Lux"));
    }

    #[tokio::test]
    async fn test_partial_batch_fetches_only_missing_ids() {
        let source = ScriptedRepository::default().with_hall(hall(2));
        let h = harness(source);
        let cache = CatalogCache::new(stores_from(h.store.clone()));
        cache
            .cache_halls(&[hall(1), hall(3)], Duration::from_secs(5))
            .await
            .unwrap();

        let halls = h.repo.get_halls(&[1, 2, 3]).await.unwrap();

        assert_eq!(sorted(halls.clone()), vec![hall(1), hall(2), hall(3)]);
        assert_eq!(h.source.halls_calls(), vec![vec![2]]);
        assert_eq!(h.metrics.hits(GET_HALLS), 2);
        assert_eq!(h.metrics.misses(GET_HALLS), 1);

        // The whole merged set is written back.
        h.scheduler.run_all().await;
        let lookup = cache.get_halls(&[1, 2, 3]).await;
        assert!(lookup.missing.is_empty());
        assert_eq!(h.store.ttl_of("hall:2"), Some(Duration::from_secs(40)));
    }

    #[tokio::test]
    async fn test_full_batch_hit_skips_source() {
        let h = harness(full_source());
        let cache = CatalogCache::new(stores_from(h.store.clone()));
        cache
            .cache_halls(&[hall(1), hall(2)], Duration::from_secs(5))
            .await
            .unwrap();

        let halls = h.repo.get_halls(&[2, 1]).await.unwrap();

        assert_eq!(sorted(halls), vec![hall(1), hall(2)]);
        assert!(h.source.halls_calls().is_empty());
        assert_eq!(h.metrics.hits(GET_HALLS), 2);
        assert_eq!(h.metrics.misses(GET_HALLS), 0);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_batch_source_error_discards_cached_part() {
        let h = harness(full_source());
        let cache = CatalogCache::new(stores_from(h.store.clone()));
        cache
            .cache_halls(&[hall(1), hall(3)], Duration::from_secs(5))
            .await
            .unwrap();
        h.source.fail_with(Error::unavailable("db down"));

        let result = h.repo.get_halls(&[1, 2, 3]).await;

        assert_eq!(result, Err(Error::unavailable("db down")));
        assert_eq!(h.source.halls_calls(), vec![vec![2]]);
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_requested_once() {
        let h = harness(full_source());

        let halls = h.repo.get_halls(&[2, 2, 1, 2]).await.unwrap();

        assert_eq!(sorted(halls), vec![hall(1), hall(2)]);
        assert_eq!(h.source.halls_calls(), vec![vec![2, 1]]);
        assert_eq!(h.metrics.misses(GET_HALLS), 2);
    }

    #[tokio::test]
    async fn test_each_entity_uses_its_own_ttl() {
        let h = harness(full_source());

        h.repo.get_cinemas_in_city(1).await.unwrap();
        h.repo.get_cities().await.unwrap();
        h.repo.get_hall_configuration(1).await.unwrap();
        h.scheduler.run_all().await;

        assert_eq!(h.store.ttl_of("city_cinemas:1"), Some(Duration::from_secs(20)));
        assert_eq!(h.store.ttl_of("city:2"), Some(Duration::from_secs(30)));
        assert_eq!(
            h.store.ttl_of("hall_configuration:1"),
            Some(Duration::from_secs(50))
        );
    }

    #[tokio::test]
    async fn test_cached_cities_match_source_order() {
        let source =
            ScriptedRepository::default().with_cities(vec![city(1, "Moscow"), city(5, "Omsk")]);
        let h = harness(source);

        let first = h.repo.get_cities().await.unwrap();
        h.scheduler.run_all().await;
        let second = h.repo.get_cities().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.source.calls("get_cities"), 1);
        assert_eq!(h.metrics.hits(GET_CITIES), 1);
    }

    #[tokio::test]
    async fn test_partially_evicted_cities_fall_back_to_source() {
        let cities = vec![city(1, "Moscow"), city(2, "Omsk"), city(3, "Kazan")];
        let h = harness(ScriptedRepository::default().with_cities(cities.clone()));

        assert_eq!(h.repo.get_cities().await, Ok(cities.clone()));
        h.scheduler.run_all().await;
        h.store.evict("city:2");

        assert_eq!(h.repo.get_cities().await, Ok(cities));
        assert_eq!(h.source.calls("get_cities"), 2);
        assert_eq!(h.metrics.misses(GET_CITIES), 2);
        assert_eq!(h.metrics.hits(GET_CITIES), 0);
    }

    #[tokio::test]
    async fn test_screening_queries_pass_through() {
        let h = harness(full_source());

        assert_eq!(h.repo.get_screening(11).await, Ok(screening(11, 7, 1, 18)));
        assert_eq!(
            h.repo.get_screenings(7, 100, day()).await,
            Ok(vec![screening(11, 7, 1, 18)])
        );
        assert_eq!(h.repo.get_city_screenings(1, 100, day()).await.unwrap().len(), 1);
        assert!(h.repo.ping().await.is_ok());

        assert_eq!(h.store.len(), 0);
        assert_eq!(h.scheduler.pending(), 0);
        assert!(h.metrics.snapshot().is_empty());
    }

    #[test]
    fn test_ttls_from_settings() {
        let config = shared::config::Config::from_lookup(|key| {
            (key == "HALLS_CONFIGURATIONS_CACHE_TTL_MS").then(|| "1234".to_string())
        });
        let ttls = CacheTtls::from(&config.cache);
        assert_eq!(ttls.halls_configurations, Duration::from_millis(1234));
        assert_eq!(ttls.halls, Duration::from_secs(3600));
    }
}
