use crate::domain::{
    Cinema, City, CityScreening, Hall, MoviesScreenings, Period, Place, Screening,
    ScreeningDetails,
};
use crate::ports::CatalogRepository;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Caller-facing entry point of the catalog.
///
/// Rejects malformed input before anything reaches the cache or the source,
/// and reports every empty list as `NotFound`.
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_cinema(&self, id: i32) -> Result<Cinema> {
        positive("cinema_id", id)?;
        self.repository.get_cinema(id).await
    }

    pub async fn get_cinemas_in_city(&self, city_id: i32) -> Result<Vec<Cinema>> {
        positive("city_id", city_id)?;
        let cinemas = self.repository.get_cinemas_in_city(city_id).await?;
        non_empty(cinemas, || format!("no cinema found in city with id {city_id}"))
    }

    pub async fn get_cities(&self) -> Result<Vec<City>> {
        let cities = self.repository.get_cities().await?;
        non_empty(cities, || "no cities with cinemas".to_string())
    }

    pub async fn get_hall_configuration(&self, hall_id: i32) -> Result<Vec<Place>> {
        positive("hall_id", hall_id)?;
        let places = self.repository.get_hall_configuration(hall_id).await?;
        non_empty(places, || format!("hall {hall_id} has no configuration"))
    }

    pub async fn get_halls(&self, ids: &[i32]) -> Result<Vec<Hall>> {
        if ids.is_empty() {
            return Err(Error::invalid_argument("halls_ids mustn't be empty"));
        }
        for id in ids {
            positive("halls_ids", *id)?;
        }
        let halls = self.repository.get_halls(ids).await?;
        non_empty(halls, || format!("halls with ids {ids:?} not found"))
    }

    pub async fn get_screening(&self, id: i64) -> Result<Screening> {
        if id <= 0 {
            return Err(Error::invalid_argument(format!(
                "screening_id must be positive, got {id}"
            )));
        }
        self.repository.get_screening(id).await
    }

    /// A screening together with the seat layout of its hall. A hall without a
    /// layout fails the whole call.
    pub async fn get_screening_details(&self, id: i64) -> Result<ScreeningDetails> {
        let screening = self.get_screening(id).await?;
        let hall_configuration = self.get_hall_configuration(screening.hall_id).await?;
        Ok(ScreeningDetails {
            screening,
            hall_configuration,
        })
    }

    pub async fn get_screenings(
        &self,
        cinema_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<Screening>> {
        positive("cinema_id", cinema_id)?;
        positive("movie_id", movie_id)?;
        ordered(&period)?;
        let screenings = self
            .repository
            .get_screenings(cinema_id, movie_id, period)
            .await?;
        non_empty(screenings, || {
            format!("no screenings of movie {movie_id} in cinema {cinema_id}")
        })
    }

    pub async fn get_city_screenings(
        &self,
        city_id: i32,
        movie_id: i32,
        period: Period,
    ) -> Result<Vec<CityScreening>> {
        positive("city_id", city_id)?;
        positive("movie_id", movie_id)?;
        ordered(&period)?;
        let screenings = self
            .repository
            .get_city_screenings(city_id, movie_id, period)
            .await?;
        non_empty(screenings, || {
            format!("no screenings of movie {movie_id} in city {city_id}")
        })
    }

    pub async fn get_movies_screenings(
        &self,
        cinema_id: i32,
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        positive("cinema_id", cinema_id)?;
        ordered(&period)?;
        let previews = self
            .repository
            .get_movies_screenings(cinema_id, period)
            .await?;
        non_empty(previews, || format!("no movies on screen in cinema {cinema_id}"))
    }

    /// Previews across the given cities, or across every city when `cities_ids` is `None`.
    pub async fn get_movies_screenings_in_cities(
        &self,
        cities_ids: Option<&[i32]>,
        period: Period,
    ) -> Result<Vec<MoviesScreenings>> {
        ordered(&period)?;
        let previews = match cities_ids {
            None => self.repository.get_all_movies_screenings(period).await?,
            Some([]) => return Err(Error::invalid_argument("cities_ids mustn't be empty")),
            Some(ids) => {
                for id in ids {
                    positive("cities_ids", *id)?;
                }
                self.repository
                    .get_movies_screenings_in_cities(ids, period)
                    .await?
            }
        };
        non_empty(previews, || format!("no movies on screen in cities {cities_ids:?}"))
    }

    pub async fn ping(&self) -> Result<()> {
        self.repository.ping().await
    }
}

fn positive(field: &str, id: i32) -> Result<()> {
    if id <= 0 {
        return Err(Error::invalid_argument(format!(
            "{field} must be positive, got {id}"
        )));
    }
    Ok(())
}

fn ordered(period: &Period) -> Result<()> {
    if period.start > period.end {
        return Err(Error::invalid_argument(
            "start period must not be after end period",
        ));
    }
    Ok(())
}

fn non_empty<T>(items: Vec<T>, describe: impl FnOnce() -> String) -> Result<Vec<T>> {
    if items.is_empty() {
        debug!("{}", describe());
        return Err(Error::NotFound);
    }
    Ok(items)
}
