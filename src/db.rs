//! Store connection handling.
//!
//! The pool is created once by the process and handed to every handler as
//! `web::Data<SqlitePool>`; connections are acquired per query or transaction.
//! Foreign keys are switched on for every connection so cascades and
//! referential checks are enforced by the store itself.

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Store URL, e.g. `sqlite://kanban_board.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://kanban_board.db".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// A single-connection in-memory store. Every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Creates the connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, AppError> {
    log::info!(
        "Connecting to database (max_connections={})",
        config.max_connections
    );

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if config.is_in_memory() {
        // Dropping the last connection drops the database with it.
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Applies every pending migration from `migrations/`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    log::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Creates the pool and brings the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, AppError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
