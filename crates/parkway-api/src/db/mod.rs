//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx.
//!
//! The database is **optional**. When a database URL is configured the API
//! persists lots, spots and reservations to Postgres through [`PgStore`].
//! When absent, the engine's in-memory store is used and state does not
//! survive restarts.
//!
//! ## Schema
//!
//! Embedded migrations under `migrations/` create `parking_lots`,
//! `parking_spots` and `reservations`. Deletes cascade from lots to spots to
//! reservations, and a partial unique index allows at most one active
//! reservation per spot.

pub mod rows;
pub mod store;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::AppConfig;

pub use store::{PgLotTransaction, PgStore};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no database URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(config: &AppConfig) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(2.min(config.db_max_connections))
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
