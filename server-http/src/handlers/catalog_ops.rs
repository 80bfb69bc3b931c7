use crate::api::ApiError;
use crate::api::requests::{
    HallsQuery, PeriodQuery, PreviewsQuery, ScreeningsQuery, parse_id, parse_screening_id,
};
use crate::api::responses::{
    CinemasResponse, CitiesResponse, CityScreeningsResponse, HallConfigurationResponse,
    HallsResponse, PreviewScreeningsResponse, ScreeningsResponse,
};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use catalog::domain::{Cinema, ScreeningDetails};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// GET /cinemas/{id}
pub async fn get_cinema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Cinema> {
    let id = parse_id("cinema_id", &id)?;
    let cinema = state.with_deadline(state.catalog.get_cinema(id)).await?;
    Ok(Json(cinema))
}

/// GET /cities
pub async fn get_cities(State(state): State<AppState>) -> ApiResult<CitiesResponse> {
    let cities = state.with_deadline(state.catalog.get_cities()).await?;
    Ok(Json(CitiesResponse { cities }))
}

/// GET /cities/{id}/cinemas
pub async fn get_cinemas_in_city(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
) -> ApiResult<CinemasResponse> {
    let city_id = parse_id("city_id", &city_id)?;
    let cinemas = state
        .with_deadline(state.catalog.get_cinemas_in_city(city_id))
        .await?;
    Ok(Json(CinemasResponse { cinemas }))
}

/// GET /cities/{id}/screenings?movie_id&start_period&end_period
pub async fn get_city_screenings(
    State(state): State<AppState>,
    Path(city_id): Path<String>,
    Query(query): Query<ScreeningsQuery>,
) -> ApiResult<CityScreeningsResponse> {
    let city_id = parse_id("city_id", &city_id)?;
    let (movie_id, period) = (query.movie_id()?, query.period()?);
    let screenings = state
        .with_deadline(state.catalog.get_city_screenings(city_id, movie_id, period))
        .await?;
    Ok(Json(CityScreeningsResponse { screenings }))
}

/// GET /cinemas/{id}/screenings?movie_id&start_period&end_period
pub async fn get_screenings(
    State(state): State<AppState>,
    Path(cinema_id): Path<String>,
    Query(query): Query<ScreeningsQuery>,
) -> ApiResult<ScreeningsResponse> {
    let cinema_id = parse_id("cinema_id", &cinema_id)?;
    let (movie_id, period) = (query.movie_id()?, query.period()?);
    let screenings = state
        .with_deadline(state.catalog.get_screenings(cinema_id, movie_id, period))
        .await?;
    Ok(Json(ScreeningsResponse { screenings }))
}

/// GET /cinemas/{id}/previews?start_period&end_period
pub async fn get_movies_screenings(
    State(state): State<AppState>,
    Path(cinema_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<PreviewScreeningsResponse> {
    let cinema_id = parse_id("cinema_id", &cinema_id)?;
    let period = query.period()?;
    let screenings = state
        .with_deadline(state.catalog.get_movies_screenings(cinema_id, period))
        .await?;
    Ok(Json(PreviewScreeningsResponse { screenings }))
}

/// GET /previews?cities_ids&start_period&end_period
pub async fn get_previews(
    State(state): State<AppState>,
    Query(query): Query<PreviewsQuery>,
) -> ApiResult<PreviewScreeningsResponse> {
    let (cities_ids, period) = (query.cities_ids()?, query.period()?);
    let screenings = state
        .with_deadline(
            state
                .catalog
                .get_movies_screenings_in_cities(cities_ids.as_deref(), period),
        )
        .await?;
    Ok(Json(PreviewScreeningsResponse { screenings }))
}

/// GET /halls?ids=1,2,3
pub async fn get_halls(
    State(state): State<AppState>,
    Query(query): Query<HallsQuery>,
) -> ApiResult<HallsResponse> {
    let ids = query.ids()?;
    let halls = state.with_deadline(state.catalog.get_halls(&ids)).await?;
    Ok(Json(HallsResponse { halls }))
}

/// GET /halls/{id}/configuration
pub async fn get_hall_configuration(
    State(state): State<AppState>,
    Path(hall_id): Path<String>,
) -> ApiResult<HallConfigurationResponse> {
    let hall_id = parse_id("hall_id", &hall_id)?;
    let places = state
        .with_deadline(state.catalog.get_hall_configuration(hall_id))
        .await?;
    Ok(Json(HallConfigurationResponse { places }))
}

/// GET /screenings/{id}
pub async fn get_screening(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ScreeningDetails> {
    let id = parse_screening_id(&id)?;
    let details = state
        .with_deadline(state.catalog.get_screening_details(id))
        .await?;
    Ok(Json(details))
}
