use std::net::SocketAddr;
use std::panic;
use std::sync::Arc;

use menu_rooms::{create_app, store::MemoryStore, AppState, Config};
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first, its log level seeds the default filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    info!("Starting server...");

    if let Err(e) = loaded {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
    }

    if config.is_development() {
        warn!("Running in development mode with the in-memory session store");
    }

    let address = config.server_address();
    let app_state = Arc::new(AppState::new(config, Arc::new(MemoryStore::new())));
    let engine = app_state.engine.clone();
    let app_routes = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 Rooms available at ws://{}/ws/{{session_id}}/", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    let served = axum::serve(
        listener,
        app_routes.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    engine.shutdown().await;
    if let Err(e) = served {
        error!("Server error: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
