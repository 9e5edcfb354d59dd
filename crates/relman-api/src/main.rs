//! relman API server

use std::sync::Arc;

use clap::Parser;
use relman_api::{AppState, ServerConfig, routes};
use relman_db::{PgPermissionStore, PgStore, create_pool, run_migrations};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(config.log_json);

    info!(max_connections = config.max_connections, "Connecting to database");
    let pool = create_pool(&config.database_url, config.max_connections).await?;
    if config.skip_migrations {
        info!("Skipping database migrations");
    } else {
        run_migrations(&pool).await?;
    }

    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(PgPermissionStore::new(pool)),
    );

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "Starting server");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
