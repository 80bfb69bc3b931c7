pub mod api;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types
pub use routes::{App, build_router};
pub use state::{AppState, Bootstrap, bootstrap};
