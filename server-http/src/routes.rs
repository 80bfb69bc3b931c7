use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use shared::config::Config;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Router wrapped so trailing slashes are trimmed before route matching.
pub type App = NormalizePath<Router>;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> App {
    let router = Router::new()
        // Probes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::cache_metrics))
        // Catalog
        .route("/cinemas/{id}", get(handlers::get_cinema))
        .route("/cinemas/{id}/screenings", get(handlers::get_screenings))
        .route("/cinemas/{id}/previews", get(handlers::get_movies_screenings))
        .route("/cities", get(handlers::get_cities))
        .route("/cities/{id}/cinemas", get(handlers::get_cinemas_in_city))
        .route("/cities/{id}/screenings", get(handlers::get_city_screenings))
        .route("/previews", get(handlers::get_previews))
        .route("/halls", get(handlers::get_halls))
        .route("/halls/{id}/configuration", get(handlers::get_hall_configuration))
        .route("/screenings/{id}", get(handlers::get_screening))
        // Middleware
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    NormalizePath::trim_trailing_slash(router)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
