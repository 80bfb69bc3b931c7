use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::config::StoreSettings;
use shared::{Error, Result};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cinema {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub coordinates: GeoPoint,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hall {
    pub id: i32,
    pub name: String,
    pub hall_type: String,
    pub size: u32,
}

/// One seat of a hall layout, with its position on the seating grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub row: i32,
    pub seat: i32,
    pub grid_pos_x: f32,
    pub grid_pos_y: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screening {
    pub id: i64,
    pub movie_id: i32,
    pub screening_type: String,
    pub hall_id: i32,
    pub cinema_id: i32,
    pub ticket_price: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityScreening {
    pub id: i64,
    pub cinema_id: i32,
    pub hall_id: i32,
    pub screening_type: String,
    pub ticket_price: String,
    pub start_time: DateTime<Utc>,
}

/// Preview of a movie on screen: which screening and hall types it runs in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviesScreenings {
    pub movie_id: i32,
    pub screenings_types: Vec<String>,
    pub halls_types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreeningDetails {
    pub screening: Screening,
    pub hall_configuration: Vec<Place>,
}

/// Inclusive time window used by the screening queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_argument(
                "start period must not be after end period",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Cached entity types. Each one lives in its own store instance and keyspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Cinema,
    CityCinemas,
    City,
    Hall,
    HallConfiguration,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Cinema => "cinema",
            EntityKind::CityCinemas => "city_cinemas",
            EntityKind::City => "city",
            EntityKind::Hall => "hall",
            EntityKind::HallConfiguration => "hall_configuration",
        }
    }
}

/// Configuration used by a store factory to build one fast-store instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
    pub max_entries: Option<u64>,
    pub default_ttl: Duration,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>, max_entries: Option<u64>, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            max_entries,
            default_ttl,
        }
    }
}

impl From<&StoreSettings> for StoreConfig {
    fn from(settings: &StoreSettings) -> Self {
        Self::new(
            settings.name.clone(),
            settings.max_entries,
            settings.ttl.as_duration(),
        )
    }
}
