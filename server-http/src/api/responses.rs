use catalog::domain::{Cinema, City, CityScreening, Hall, MoviesScreenings, Place, Screening};
use catalog::planes::control::OperationStats;
use serde::Serialize;
use shared::ErrorCode;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            code: code.as_str(),
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: String,
    pub repository: String,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub operations: Vec<OperationStats>,
}

#[derive(Debug, Serialize)]
pub struct CinemasResponse {
    pub cinemas: Vec<Cinema>,
}

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<City>,
}

#[derive(Debug, Serialize)]
pub struct HallsResponse {
    pub halls: Vec<Hall>,
}

#[derive(Debug, Serialize)]
pub struct HallConfigurationResponse {
    pub places: Vec<Place>,
}

#[derive(Debug, Serialize)]
pub struct ScreeningsResponse {
    pub screenings: Vec<Screening>,
}

#[derive(Debug, Serialize)]
pub struct CityScreeningsResponse {
    pub screenings: Vec<CityScreening>,
}

#[derive(Debug, Serialize)]
pub struct PreviewScreeningsResponse {
    pub screenings: Vec<MoviesScreenings>,
}
