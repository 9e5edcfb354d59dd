//! Database layer for relman.
//!
//! Provides the PostgreSQL implementations of the store and permission ports.

pub mod error;
pub mod repo;
pub mod store;

pub use error::{DbError, DbResult};
pub use repo::access::PgPermissionStore;
pub use store::{PgStore, PgTx};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Create a new database connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
