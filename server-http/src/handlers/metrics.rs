use crate::api::responses::MetricsResponse;
use crate::state::AppState;
use axum::{Json, extract::State};

/// GET /metrics
pub async fn cache_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        operations: state.metrics.snapshot(),
    })
}
