use crate::api::responses::HealthResponse;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};

/// GET /health
///
/// Pings every fast store and the source repository. Any failure turns the
/// whole service unhealthy.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.with_deadline(state.cache.ping()).await;
    let repository = state.with_deadline(state.catalog.ping()).await;

    let status = if cache.is_ok() && repository.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let describe = |result: shared::Result<()>| match result {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };

    (
        status,
        Json(HealthResponse {
            status: if status.is_success() { "ok" } else { "unavailable" },
            cache: describe(cache),
            repository: describe(repository),
        }),
    )
}
