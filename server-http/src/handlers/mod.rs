pub mod catalog_ops;
pub mod health;
pub mod metrics;

pub use catalog_ops::{
    get_cinema, get_cinemas_in_city, get_cities, get_city_screenings, get_hall_configuration,
    get_halls, get_movies_screenings, get_previews, get_screening, get_screenings,
};
pub use health::health_check;
pub use metrics::cache_metrics;
