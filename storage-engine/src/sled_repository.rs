use async_trait::async_trait;
use catalog::domain::{
    Cinema, City, CityScreening, GeoPoint, Hall, MoviesScreenings, Period, Place, Screening,
};
use catalog::ports::CatalogRepository;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::info;

const CITIES: &str = "cities";
const CINEMAS: &str = "cinemas";
const HALLS: &str = "halls";
const SCREENINGS: &str = "screenings";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CinemaRecord {
    #[serde(flatten)]
    cinema: Cinema,
    city_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HallRecord {
    #[serde(flatten)]
    hall: Hall,
    cinema_id: i32,
    places: Vec<Place>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScreeningRecord {
    #[serde(flatten)]
    screening: Screening,
    hall_type: String,
}

/// Catalog file used to populate an empty database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub cities: Vec<City>,
    #[serde(default)]
    pub cinemas: Vec<SeedCinema>,
    #[serde(default)]
    pub halls: Vec<SeedHall>,
    #[serde(default)]
    pub screenings: Vec<SeedScreening>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCinema {
    pub id: i32,
    pub city_id: i32,
    pub name: String,
    pub address: String,
    pub coordinates: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedHall {
    pub id: i32,
    pub cinema_id: i32,
    pub name: String,
    #[serde(default)]
    pub hall_type: String,
    pub size: u32,
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedScreening {
    pub id: i64,
    pub movie_id: i32,
    pub hall_id: i32,
    pub screening_type: String,
    pub ticket_price: String,
    pub start_time: DateTime<Utc>,
}

pub fn load_seed(path: impl AsRef<Path>) -> Result<CatalogSeed> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .map_err(|e| Error::Internal(format!("Failed to read seed {}: {}", path.display(), e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| Error::Internal(format!("Failed to parse seed {}: {}", path.display(), e)))
}

/// Sled-backed source of truth for the catalog.
pub struct SledCatalogRepository {
    db: sled::Db,
    cities: sled::Tree,
    cinemas: sled::Tree,
    halls: sled::Tree,
    screenings: sled::Tree,
}

impl SledCatalogRepository {
    /// Opens (or creates) the database, creating the parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open Sled database: {}", e)))?;
        let tree = |name: &str| {
            db.open_tree(name)
                .map_err(|e| Error::Internal(format!("Failed to open tree {}: {}", name, e)))
        };

        Ok(Self {
            cities: tree(CITIES)?,
            cinemas: tree(CINEMAS)?,
            halls: tree(HALLS)?,
            screenings: tree(SCREENINGS)?,
            db,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.cinemas.is_empty()
    }

    /// Writes every record of `seed`. References between records are checked
    /// up front so a bad file leaves the database untouched.
    pub fn seed(&self, seed: &CatalogSeed) -> Result<()> {
        let city_ids: HashSet<i32> = seed.cities.iter().map(|c| c.id).collect();
        let cinema_ids: HashSet<i32> = seed.cinemas.iter().map(|c| c.id).collect();
        let halls: HashMap<i32, &SeedHall> = seed.halls.iter().map(|h| (h.id, h)).collect();

        if let Some(c) = seed.cinemas.iter().find(|c| !city_ids.contains(&c.city_id)) {
            return Err(Error::invalid_argument(format!(
                "cinema {} references unknown city {}",
                c.id, c.city_id
            )));
        }
        if let Some(h) = seed.halls.iter().find(|h| !cinema_ids.contains(&h.cinema_id)) {
            return Err(Error::invalid_argument(format!(
                "hall {} references unknown cinema {}",
                h.id, h.cinema_id
            )));
        }

        let mut screenings = Vec::with_capacity(seed.screenings.len());
        for s in &seed.screenings {
            let hall = halls.get(&s.hall_id).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "screening {} references unknown hall {}",
                    s.id, s.hall_id
                ))
            })?;
            screenings.push(ScreeningRecord {
                screening: Screening {
                    id: s.id,
                    movie_id: s.movie_id,
                    screening_type: s.screening_type.clone(),
                    hall_id: s.hall_id,
                    cinema_id: hall.cinema_id,
                    ticket_price: s.ticket_price.clone(),
                    start_time: s.start_time,
                },
                hall_type: hall.hall_type.clone(),
            });
        }

        for city in &seed.cities {
            put(&self.cities, &city.id.to_be_bytes(), city)?;
        }
        for c in &seed.cinemas {
            let record = CinemaRecord {
                cinema: Cinema {
                    id: c.id,
                    name: c.name.clone(),
                    address: c.address.clone(),
                    coordinates: c.coordinates,
                },
                city_id: c.city_id,
            };
            put(&self.cinemas, &c.id.to_be_bytes(), &record)?;
        }
        for h in &seed.halls {
            let mut places = h.places.clone();
            places.sort_by_key(|p| (p.row, p.seat));
            let record = HallRecord {
                hall: Hall {
                    id: h.id,
                    name: h.name.clone(),
                    hall_type: h.hall_type.clone(),
                    size: h.size,
                },
                cinema_id: h.cinema_id,
                places,
            };
            put(&self.halls, &h.id.to_be_bytes(), &record)?;
        }
        for record in &screenings {
            put(&self.screenings, &record.screening.id.to_be_bytes(), record)?;
        }

        self.db
            .flush()
            .map_err(|e| Error::Internal(format!("Failed to flush database: {}", e)))?;

        info!(
            cities = seed.cities.len(),
            cinemas = seed.cinemas.len(),
            halls = seed.halls.len(),
            screenings = screenings.len(),
            "catalog seeded"
        );
        Ok(())
    }

    /// Seeds from a JSON file, but only when the database holds no catalog yet.
    pub fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<bool> {
        if !self.is_empty() {
            return Ok(false);
        }
        let seed = load_seed(path)?;
        self.seed(&seed)?;
        Ok(true)
    }

    fn cinema_records(&self) -> Result<Vec<CinemaRecord>> {
        scan(&self.cinemas)
    }

    fn screening_records(&self) -> Result<Vec<ScreeningRecord>> {
        scan(&self.screenings)
    }

    fn cinema_ids_in_cities(&self, cities: &HashSet<i32>) -> Result<HashSet<i32>> {
        Ok(self
            .cinema_records()?
            .into_iter()
            .filter(|r| cities.contains(&r.city_id))
            .map(|r| r.cinema.id)
            .collect())
    }
}

#[async_trait]
impl CatalogRepository for SledCatalogRepository {
    async fn get_cinema(&self, id: i32) -> Result<Cinema> {
        get::<CinemaRecord>(&self.cinemas, &id.to_be_bytes())?
            .map(|r| r.cinema)
            .ok_or(Error::NotFound)
    }

    async fn get_cinemas_in_city(&self, city_id: i32) -> Result<Vec<Cinema>> {
        // Keys are big-endian ids, so the scan is already ordered by id.
        Ok(self
            .cinema_records()?
            .into_iter()
            .filter(|r| r.city_id == city_id)
            .map(|r| r.cinema)
            .collect())
    }

    async fn get_cities(&self) -> Result<Vec<City>> {
        let with_cinemas: HashSet<i32> =
            self.cinema_records()?.iter().map(|r| r.city_id).collect();
        let cities: Vec<City> = scan(&self.cities)?;
        Ok(cities
            .into_iter()
            .filter(|c| with_cinemas.contains(&c.id))
            .collect())
    }

    async fn get_hall_configuration(&self, hall_id: i32) -> Result<Vec<Place>> {
        Ok(get::<HallRecord>(&self.halls, &hall_id.to_be_bytes())?
            .map(|r| r.places)
            .unwrap_or_default())
    }

    async fn get_halls(&self, ids: &[i32]) -> Result<Vec<Hall>> {
        let mut halls = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = get::<HallRecord>(&self.halls, &id.to_be_bytes())? {
                halls.push(record.hall);
            }
        }
        Ok(halls)
    }

    async fn get_screening(&self, id: i64) -> Result<Screening> {
        get::<ScreeningRecord>(&self.screenings, &id.to_be_bytes())?
            .map(|r| r.screening)
            .ok_or(Error::NotFound)
    }

    async fn get_screenings(
        &self,
        cinema_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<Screening>> {
        let mut screenings: Vec<Screening> = self
            .screening_records()?
            .into_iter()
            .map(|r| r.screening)
            .filter(|s| {
                s.cinema_id == cinema_id && s.movie_id == movie_id && period.contains(&s.start_time)
            })
            .collect();
        screenings.sort_by_key(|s| (s.start_time, s.id));
        Ok(screenings)
    }

    async fn get_city_screenings(
        &self,
        city_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<CityScreening>> {
        let cinemas = self.cinema_ids_in_cities(&HashSet::from([city_id]))?;
        let mut screenings: Vec<CityScreening> = self
            .screening_records()?
            .into_iter()
            .map(|r| r.screening)
            .filter(|s| {
                cinemas.contains(&s.cinema_id)
                    && s.movie_id == movie_id
                    && period.contains(&s.start_time)
            })
            .map(|s| CityScreening {
                id: s.id,
                cinema_id: s.cinema_id,
                hall_id: s.hall_id,
                screening_type: s.screening_type,
                ticket_price: s.ticket_price,
                start_time: s.start_time,
            })
            .collect();
        screenings.sort_by_key(|s| (s.start_time, s.id));
        Ok(screenings)
    }

    async fn get_movies_screenings(
        &self,
        cinema_id: i32,
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        let records = self.screening_records()?;
        Ok(previews(
            records.iter().filter(|r| r.screening.cinema_id == cinema_id),
            &period,
        ))
    }

    async fn get_all_movies_screenings(&self, period: Period) -> Result<Vec<MoviesScreenings>> {
        let records = self.screening_records()?;
        Ok(previews(records.iter(), &period))
    }

    async fn get_movies_screenings_in_cities(
        &self,
        cities_ids: &[i32],
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        let cities: HashSet<i32> = cities_ids.iter().copied().collect();
        let cinemas = self.cinema_ids_in_cities(&cities)?;
        let records = self.screening_records()?;
        Ok(previews(
            records
                .iter()
                .filter(|r| cinemas.contains(&r.screening.cinema_id)),
            &period,
        ))
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .size_on_disk()
            .map(|_| ())
            .map_err(|e| Error::Unavailable(format!("Sled database unavailable: {}", e)))
    }
}

/// Groups screenings inside `period` by movie, with sorted distinct types.
fn previews<'a>(
    records: impl Iterator<Item = &'a ScreeningRecord>,
    period: &Period,
) -> Vec<MoviesScreenings> {
    let mut by_movie: BTreeMap<i32, (BTreeSet<String>, BTreeSet<String>)> = BTreeMap::new();
    for record in records.filter(|r| period.contains(&r.screening.start_time)) {
        let (screening_types, hall_types) = by_movie.entry(record.screening.movie_id).or_default();
        screening_types.insert(record.screening.screening_type.clone());
        if !record.hall_type.is_empty() {
            hall_types.insert(record.hall_type.clone());
        }
    }
    by_movie
        .into_iter()
        .map(|(movie_id, (screenings_types, halls_types))| MoviesScreenings {
            movie_id,
            screenings_types: screenings_types.into_iter().collect(),
            halls_types: halls_types.into_iter().collect(),
        })
        .collect()
}

fn put<T: Serialize + ?Sized>(tree: &sled::Tree, key: &[u8], value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize record: {}", e)))?;
    tree.insert(key, bytes)
        .map_err(|e| Error::Internal(format!("Failed to write record: {}", e)))?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> Result<Option<T>> {
    let value = tree
        .get(key)
        .map_err(|e| Error::Internal(format!("Failed to read record: {}", e)))?;
    value
        .map(|bytes| {
            serde_json::from_slice(&bytes)
                .map_err(|e| Error::Internal(format!("Failed to deserialize record: {}", e)))
        })
        .transpose()
}

fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for result in tree.iter() {
        let (_, value) =
            result.map_err(|e| Error::Internal(format!("Failed to iterate database: {}", e)))?;
        let record = serde_json::from_slice(&value)
            .map_err(|e| Error::Internal(format!("Failed to deserialize record: {}", e)))?;
        records.push(record);
    }
    Ok(records)
}
