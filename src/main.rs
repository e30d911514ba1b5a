use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use snaplink::analytics::geo::{DisabledGeo, GeoLookup, HttpGeoService};
use snaplink::analytics::recorder::ClickRecorder;
use snaplink::api::{self, AppState};
use snaplink::config::{Config, DatabaseBackend};
use snaplink::quota::QuotaTracker;
use snaplink::redirect;
use snaplink::storage::{PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections)
                    .await?,
            )
        }
    };

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    // Geolocation is best-effort; disabling it only blanks the geo fields
    let geo: Arc<dyn GeoLookup> = if config.geo.enabled {
        info!("🌍 Geolocation enabled via {}", config.geo.api_url);
        Arc::new(HttpGeoService::new(config.geo.api_url.clone())?)
    } else {
        info!("🌍 Geolocation disabled");
        Arc::new(DisabledGeo)
    };

    let recorder = Arc::new(ClickRecorder::new(Arc::clone(&storage), geo));
    let quota = QuotaTracker::new(Arc::clone(&storage));

    let api_state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        quota,
        short_domain: config.short_domain.clone(),
    });

    // One listener: management API under /api, short-code redirects at root
    let app = Router::new()
        .nest("/api", api::create_api_router(api_state))
        .merge(redirect::create_redirect_router(
            Arc::clone(&storage),
            recorder,
        ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 snaplink listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/...", addr);
    info!("   - Short links served from http://{}/<code>", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
