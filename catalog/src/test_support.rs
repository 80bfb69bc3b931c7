//! Fakes shared by the catalog unit tests.

use crate::domain::{
    Cinema, City, CityScreening, GeoPoint, Hall, MoviesScreenings, Period, Place, Screening,
};
use crate::planes::data::CatalogStores;
use crate::ports::{CatalogRepository, StoreClient, WriteBack, WriteBackScheduler};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store that records writes and can be switched into a failing mode
/// where every call returns `Error::Unavailable`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Bytes, Duration)>>,
    set_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: &str, bytes: Bytes) {
        self.entries
            .lock()
            .insert(key.to_string(), (bytes, Duration::from_secs(60)));
    }

    /// Drops `key` the way a size-bounded store evicts it.
    pub fn evict(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::unavailable("store is down"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check()?;
        Ok(self.entries.lock().get(key).map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.check()?;
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().insert(key.to_string(), (value, ttl));
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Bytes>>> {
        self.check()?;
        let entries = self.entries.lock();
        Ok(keys
            .iter()
            .map(|key| entries.get(key).map(|(bytes, _)| bytes.clone()))
            .collect())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check()?;
        let entries = self.entries.lock();
        let matches = |key: &str| match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        };
        Ok(entries.keys().filter(|key| matches(key.as_str())).cloned().collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

/// Every entity type backed by the same store. Keys are namespaced, so they never collide.
pub fn stores_from(store: Arc<MemoryStore>) -> CatalogStores {
    CatalogStores {
        cinemas: store.clone(),
        cities_cinemas: store.clone(),
        cities: store.clone(),
        halls: store.clone(),
        halls_configurations: store,
    }
}

/// Source repository answering from fixed data and logging each call.
#[derive(Default)]
pub struct ScriptedRepository {
    cinemas: HashMap<i32, Cinema>,
    city_cinemas: HashMap<i32, Vec<Cinema>>,
    cities: Vec<City>,
    halls: HashMap<i32, Hall>,
    configurations: HashMap<i32, Vec<Place>>,
    screenings: Vec<Screening>,
    previews: Vec<MoviesScreenings>,
    failure: Mutex<Option<Error>>,
    calls: Mutex<Vec<&'static str>>,
    halls_calls: Mutex<Vec<Vec<i32>>>,
}

impl ScriptedRepository {
    pub fn with_cinema(mut self, cinema: Cinema) -> Self {
        self.cinemas.insert(cinema.id, cinema);
        self
    }

    pub fn with_city_cinemas(mut self, city_id: i32, cinemas: Vec<Cinema>) -> Self {
        self.city_cinemas.insert(city_id, cinemas);
        self
    }

    pub fn with_cities(mut self, cities: Vec<City>) -> Self {
        self.cities = cities;
        self
    }

    pub fn with_hall(mut self, hall: Hall) -> Self {
        self.halls.insert(hall.id, hall);
        self
    }

    pub fn with_configuration(mut self, hall_id: i32, places: Vec<Place>) -> Self {
        self.configurations.insert(hall_id, places);
        self
    }

    pub fn with_screening(mut self, screening: Screening) -> Self {
        self.screenings.push(screening);
        self
    }

    pub fn with_preview(mut self, preview: MoviesScreenings) -> Self {
        self.previews.push(preview);
        self
    }

    /// Every following call fails with `err`.
    pub fn fail_with(&self, err: Error) {
        *self.failure.lock() = Some(err);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|op| **op == operation).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn halls_calls(&self) -> Vec<Vec<i32>> {
        self.halls_calls.lock().clone()
    }

    fn enter(&self, operation: &'static str) -> Result<()> {
        self.calls.lock().push(operation);
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogRepository for ScriptedRepository {
    async fn get_cinema(&self, id: i32) -> Result<Cinema> {
        self.enter("get_cinema")?;
        self.cinemas.get(&id).cloned().ok_or(Error::NotFound)
    }

    async fn get_cinemas_in_city(&self, city_id: i32) -> Result<Vec<Cinema>> {
        self.enter("get_cinemas_in_city")?;
        Ok(self.city_cinemas.get(&city_id).cloned().unwrap_or_default())
    }

    async fn get_cities(&self) -> Result<Vec<City>> {
        self.enter("get_cities")?;
        Ok(self.cities.clone())
    }

    async fn get_hall_configuration(&self, hall_id: i32) -> Result<Vec<Place>> {
        self.enter("get_hall_configuration")?;
        Ok(self.configurations.get(&hall_id).cloned().unwrap_or_default())
    }

    async fn get_halls(&self, ids: &[i32]) -> Result<Vec<Hall>> {
        self.halls_calls.lock().push(ids.to_vec());
        self.enter("get_halls")?;
        Ok(ids.iter().filter_map(|id| self.halls.get(id).cloned()).collect())
    }

    async fn get_screening(&self, id: i64) -> Result<Screening> {
        self.enter("get_screening")?;
        self.screenings
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn get_screenings(
        &self,
        cinema_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<Screening>> {
        self.enter("get_screenings")?;
        Ok(self
            .screenings
            .iter()
            .filter(|s| {
                s.cinema_id == cinema_id && s.movie_id == movie_id && period.contains(&s.start_time)
            })
            .cloned()
            .collect())
    }

    async fn get_city_screenings(
        &self,
        city_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<CityScreening>> {
        self.enter("get_city_screenings")?;
        let in_city: Vec<i32> = self
            .city_cinemas
            .get(&city_id)
            .map(|cinemas| cinemas.iter().map(|c| c.id).collect())
            .unwrap_or_default();
        Ok(self
            .screenings
            .iter()
            .filter(|s| {
                in_city.contains(&s.cinema_id)
                    && s.movie_id == movie_id
                    && period.contains(&s.start_time)
            })
            .map(|s| CityScreening {
                id: s.id,
                cinema_id: s.cinema_id,
                hall_id: s.hall_id,
                screening_type: s.screening_type.clone(),
                ticket_price: s.ticket_price.clone(),
                start_time: s.start_time,
            })
            .collect())
    }

    async fn get_movies_screenings(
        &self,
        _cinema_id: i32,
        _period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        self.enter("get_movies_screenings")?;
        Ok(self.previews.clone())
    }

    async fn get_all_movies_screenings(&self, _period: Period) -> Result<Vec<MoviesScreenings>> {
        self.enter("get_all_movies_screenings")?;
        Ok(self.previews.clone())
    }

    async fn get_movies_screenings_in_cities(
        &self,
        _cities_ids: &[i32],
        _period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        self.enter("get_movies_screenings_in_cities")?;
        Ok(self.previews.clone())
    }

    async fn ping(&self) -> Result<()> {
        self.enter("ping")
    }
}

/// Holds write-backs until the test decides to run them.
#[derive(Default)]
pub struct QueuedScheduler {
    jobs: Mutex<Vec<WriteBack>>,
}

impl QueuedScheduler {
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub async fn run_all(&self) -> Vec<Result<()>> {
        let jobs: Vec<WriteBack> = std::mem::take(&mut *self.jobs.lock());
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            results.push(job.run().await);
        }
        results
    }
}

impl WriteBackScheduler for QueuedScheduler {
    fn schedule(&self, job: WriteBack) {
        self.jobs.lock().push(job);
    }
}

pub fn cinema(id: i32, name: &str) -> Cinema {
    Cinema {
        id,
        name: name.to_string(),
        address: "Main St 1".to_string(),
        coordinates: GeoPoint {
            latitude: 10.0,
            longitude: 20.0,
        },
    }
}

pub fn city(id: i32, name: &str) -> City {
    City {
        id,
        name: name.to_string(),
    }
}

pub fn hall(id: i32) -> Hall {
    Hall {
        id,
        name: format!("Hall {id}"),
        hall_type: "standard".to_string(),
        size: 120,
    }
}

pub fn place(row: i32, seat: i32) -> Place {
    Place {
        row,
        seat,
        grid_pos_x: seat as f32,
        grid_pos_y: row as f32,
    }
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

pub fn screening(id: i64, cinema_id: i32, hall_id: i32, hour: u32) -> Screening {
    Screening {
        id,
        movie_id: 100,
        screening_type: "2D".to_string(),
        hall_id,
        cinema_id,
        ticket_price: "350.00".to_string(),
        start_time: at(hour),
    }
}

pub fn day() -> Period {
    Period {
        start: at(0),
        end: at(23),
    }
}
