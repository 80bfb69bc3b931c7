use axum::{ServiceExt, extract::Request};
use server_http::{Bootstrap, bootstrap, routes};
use shared::config::Config;
use std::path::Path;
use std::sync::Arc;
use storage_engine::{MokaStoreFactory, SledCatalogRepository};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if exists)
    let dotenv = dotenvy::dotenv();

    // Load configuration from environment variables
    let config = Config::from_env();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    info!("Starting cinema catalog HTTP server...");

    let db_path = Path::new(&config.data_dir).join("catalog.sled");
    let source = match SledCatalogRepository::open(&db_path) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open catalog at {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    if let Some(seed_path) = &config.seed_path {
        match source.seed_from_file(seed_path) {
            Ok(true) => info!("Catalog seeded from {}", seed_path),
            Ok(false) => info!("Catalog already populated, skipping seed {}", seed_path),
            Err(e) => {
                error!("Failed to seed catalog from {}: {}", seed_path, e);
                std::process::exit(1);
            }
        }
    }

    for store in config.cache.all() {
        info!(
            "Cache store '{}': ttl={}ms max_entries={:?}",
            store.name, store.ttl.0, store.max_entries
        );
    }

    let Bootstrap { state, writer } = bootstrap(&config, Arc::new(source), &MokaStoreFactory);
    let app = routes::build_router(state, &config);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind HTTP listener");

    info!("HTTP Server listening on http://{}", address);

    // Graceful shutdown handler
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    info!("Draining pending cache write-backs...");
    writer.shutdown().await;
    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
