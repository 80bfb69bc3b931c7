use crate::codec;
use crate::domain::{Cinema, City, EntityKind, Hall, Place};
use crate::ports::StoreClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a lookup could not be served from the cache. Only used for logging:
/// the read path treats every reason the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Undecodable(String),
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    Miss(MissReason),
}

/// Result of a batch hall lookup. `found` and `missing` never share an id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HallsLookup {
    pub found: Vec<Hall>,
    pub missing: Vec<i32>,
}

/// One store handle per cached entity type.
#[derive(Clone)]
pub struct CatalogStores {
    pub cinemas: Arc<dyn StoreClient>,
    pub cities_cinemas: Arc<dyn StoreClient>,
    pub cities: Arc<dyn StoreClient>,
    pub halls: Arc<dyn StoreClient>,
    pub halls_configurations: Arc<dyn StoreClient>,
}

/// Typed view over the per-entity fast stores.
///
/// Lookups never fail: an absent key, an undecodable value and an unreachable
/// store all come back as [`Lookup::Miss`]. Writes report errors so the
/// write-back path can log them.
pub struct CatalogCache {
    stores: CatalogStores,
}

impl CatalogCache {
    pub fn new(stores: CatalogStores) -> Self {
        Self { stores }
    }

    /// Pings every backing store; the first failure marks the whole cache unhealthy.
    pub async fn ping(&self) -> Result<()> {
        for (name, store) in self.named_stores() {
            store
                .ping()
                .await
                .map_err(|e| Error::unavailable(format!("{name} cache: {e}")))?;
        }
        Ok(())
    }

    pub async fn get_cinema(&self, id: i32) -> Lookup<Cinema> {
        get_one(
            self.stores.cinemas.as_ref(),
            codec::cache_key(EntityKind::Cinema, id),
        )
        .await
    }

    pub async fn cache_cinema(&self, cinema: &Cinema, ttl: Duration) -> Result<()> {
        put_one(
            self.stores.cinemas.as_ref(),
            codec::cache_key(EntityKind::Cinema, cinema.id),
            cinema,
            ttl,
        )
        .await
    }

    pub async fn get_cinemas_in_city(&self, city_id: i32) -> Lookup<Vec<Cinema>> {
        get_one(
            self.stores.cities_cinemas.as_ref(),
            codec::cache_key(EntityKind::CityCinemas, city_id),
        )
        .await
    }

    pub async fn cache_cinemas_in_city(
        &self,
        city_id: i32,
        cinemas: &[Cinema],
        ttl: Duration,
    ) -> Result<()> {
        put_one(
            self.stores.cities_cinemas.as_ref(),
            codec::cache_key(EntityKind::CityCinemas, city_id),
            cinemas,
            ttl,
        )
        .await
    }

    /// Enumerates every cached city. The scan must yield exactly the ids of the
    /// last written list; an evicted, expired or undecodable entry turns the
    /// whole list into a miss.
    pub async fn get_cities(&self) -> Lookup<Vec<City>> {
        let store = self.stores.cities.as_ref();

        let index = codec::index_key(EntityKind::City);
        let mut expected: Vec<i32> = match get_one(store, index).await {
            Lookup::Hit(ids) => ids,
            Lookup::Miss(reason) => return Lookup::Miss(reason),
        };
        expected.sort_unstable();

        let keys = match store.keys(&codec::key_pattern(EntityKind::City)).await {
            Ok(keys) => keys,
            Err(e) => return unavailable("cities", e),
        };
        if keys.is_empty() {
            return Lookup::Miss(MissReason::Absent);
        }

        let values = match store.multi_get(&keys).await {
            Ok(values) => values,
            Err(e) => return unavailable("cities", e),
        };

        let mut cities = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(bytes) = value else {
                debug!(key = %key, "city expired during scan");
                return Lookup::Miss(MissReason::Absent);
            };
            match codec::decode::<City>(&bytes) {
                Ok(city) => cities.push(city),
                Err(e) => {
                    warn!(key = %key, error = %e, "undecodable city in cache");
                    return Lookup::Miss(MissReason::Undecodable(e.to_string()));
                }
            }
        }

        cities.sort_by_key(|city| city.id);
        if !cities.iter().map(|city| city.id).eq(expected.iter().copied()) {
            debug!(
                cached = cities.len(),
                expected = expected.len(),
                "cached city list is incomplete"
            );
            return Lookup::Miss(MissReason::Absent);
        }
        Lookup::Hit(cities)
    }

    /// Writes every city, then the id list that marks the set as complete.
    pub async fn cache_cities(&self, cities: &[City], ttl: Duration) -> Result<()> {
        let store = self.stores.cities.as_ref();
        for city in cities {
            put_one(store, codec::cache_key(EntityKind::City, city.id), city, ttl).await?;
        }
        let ids: Vec<i32> = cities.iter().map(|city| city.id).collect();
        put_one(store, codec::index_key(EntityKind::City), &ids, ttl).await
    }

    pub async fn get_hall_configuration(&self, hall_id: i32) -> Lookup<Vec<Place>> {
        get_one(
            self.stores.halls_configurations.as_ref(),
            codec::cache_key(EntityKind::HallConfiguration, hall_id),
        )
        .await
    }

    pub async fn cache_hall_configuration(
        &self,
        hall_id: i32,
        places: &[Place],
        ttl: Duration,
    ) -> Result<()> {
        put_one(
            self.stores.halls_configurations.as_ref(),
            codec::cache_key(EntityKind::HallConfiguration, hall_id),
            places,
            ttl,
        )
        .await
    }

    /// Resolves as many of `ids` as the cache holds. Each slot is decoded on its
    /// own, so one bad entry only sends that id to `missing`.
    pub async fn get_halls(&self, ids: &[i32]) -> HallsLookup {
        let keys: Vec<String> = ids
            .iter()
            .map(|id| codec::cache_key(EntityKind::Hall, *id))
            .collect();

        let values = match self.stores.halls.multi_get(&keys).await {
            Ok(values) if values.len() == keys.len() => values,
            Ok(values) => {
                warn!(
                    requested = keys.len(),
                    returned = values.len(),
                    "halls cache returned a misaligned batch"
                );
                return all_missing(ids);
            }
            Err(e) => {
                warn!(error = %e, "halls cache unavailable");
                return all_missing(ids);
            }
        };

        let mut lookup = HallsLookup {
            found: Vec::with_capacity(ids.len()),
            missing: Vec::new(),
        };
        for (id, value) in ids.iter().zip(values) {
            match value.map(|bytes| codec::decode::<Hall>(&bytes)) {
                Some(Ok(hall)) if hall.id == *id => lookup.found.push(hall),
                Some(Ok(hall)) => {
                    warn!(key_id = id, hall_id = hall.id, "cached hall under the wrong key");
                    lookup.missing.push(*id);
                }
                Some(Err(e)) => {
                    warn!(hall_id = id, error = %e, "undecodable hall in cache");
                    lookup.missing.push(*id);
                }
                None => lookup.missing.push(*id),
            }
        }
        lookup
    }

    pub async fn cache_halls(&self, halls: &[Hall], ttl: Duration) -> Result<()> {
        let store = self.stores.halls.as_ref();
        for hall in halls {
            put_one(store, codec::cache_key(EntityKind::Hall, hall.id), hall, ttl).await?;
        }
        Ok(())
    }

    fn named_stores(&self) -> [(&'static str, &Arc<dyn StoreClient>); 5] {
        [
            ("cinemas", &self.stores.cinemas),
            ("cities cinemas", &self.stores.cities_cinemas),
            ("cities", &self.stores.cities),
            ("halls", &self.stores.halls),
            ("halls configurations", &self.stores.halls_configurations),
        ]
    }
}

async fn get_one<T: DeserializeOwned>(store: &dyn StoreClient, key: String) -> Lookup<T> {
    match store.get(&key).await {
        Ok(Some(bytes)) => match codec::decode(&bytes) {
            Ok(value) => Lookup::Hit(value),
            Err(e) => {
                warn!(key = %key, error = %e, "undecodable cache entry");
                Lookup::Miss(MissReason::Undecodable(e.to_string()))
            }
        },
        Ok(None) => Lookup::Miss(MissReason::Absent),
        Err(e) => unavailable(&key, e),
    }
}

async fn put_one<T>(store: &dyn StoreClient, key: String, value: &T, ttl: Duration) -> Result<()>
where
    T: Serialize + Sync + ?Sized,
{
    let bytes = codec::encode(value)?;
    store.set(&key, bytes, ttl).await
}

fn unavailable<T>(what: &str, err: Error) -> Lookup<T> {
    warn!(target = %what, error = %err, "cache unavailable, treating as miss");
    Lookup::Miss(MissReason::Unavailable(err.to_string()))
}

fn all_missing(ids: &[i32]) -> HallsLookup {
    HallsLookup {
        found: Vec::new(),
        missing: ids.to_vec(),
    }
}
