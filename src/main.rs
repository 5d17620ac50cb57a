use campus_site_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::Repositories,
    storage::{LocalStorage, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: loads configuration, sets up logging, connects to Postgres, prepares
/// the upload directory and serves the API.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_site_api=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET is not set; signing tokens with the local development secret");
    }

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repos = Repositories::postgres(pool);

    // 5. Upload storage on local disk.
    let local_storage = LocalStorage::new(config.upload_dir.clone());
    local_storage
        .ensure_root()
        .await
        .expect("FATAL: Could not create the upload directory. Check UPLOAD_DIR.");
    let storage = Arc::new(local_storage) as StorageState;

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let base_path = config.base_path.clone();
    let app = create_router(AppState::new(repos, storage, config));

    // 7. Server Startup
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Could not bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://{}{}/swagger-ui",
        bind_addr,
        base_path
    );

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
