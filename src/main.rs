use konsortium_portal::{
    AppState, HttpPageRegistry, InMemoryPageRegistry, RegistryState,
    config::{AppConfig, Env},
    create_router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, page registry, HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG first, then development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "konsortium_portal=debug,audit=info,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Portal gate starting in {:?} mode", config.env);

    if config.api_key.trim().is_empty() {
        // Not fatal: guarded endpoints answer 500 until it is set.
        tracing::error!("PORTAL_API_KEY is not set; every guarded API call will be rejected");
    }

    // 3. Page Registry
    let registry: RegistryState = match &config.content_api_url {
        Some(url) => {
            let client = HttpPageRegistry::new(url, &config.api_key, config.registry_timeout)
                .expect("FATAL: CONTENT_API_URL is not a usable base url.");
            tracing::info!(url = %url, "using content service page registry");
            Arc::new(client) as RegistryState
        }
        None => {
            let local = match &config.page_registry_file {
                Some(path) => InMemoryPageRegistry::from_seed_file(path)
                    .expect("FATAL: PAGE_REGISTRY_FILE could not be loaded."),
                None => InMemoryPageRegistry::new(),
            };
            tracing::warn!("CONTENT_API_URL not set; using the in-memory page registry");
            Arc::new(local) as RegistryState
        }
    };

    // 4. Router and Server Startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config, registry));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind the listen address.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("FATAL: HTTP server terminated unexpectedly.");
}
