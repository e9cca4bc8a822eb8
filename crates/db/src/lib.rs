//! PostgreSQL persistence for slidereel.
//!
//! Pool helpers, row models, repositories, and the [`PgRenderStore`]
//! implementation of the core `RenderStore` trait.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod render_store;
pub mod repositories;

pub use render_store::PgRenderStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
