use std::str::FromStr;
use std::time::Duration;

use docgate_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

/// Opens the pool described by the `[database]` config section.
///
/// Foreign keys and WAL are always on; pool sizing, the acquire timeout, and
/// the SQLite busy timeout all come from config.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .connect_with(options)
        .await
}

/// Single-connection in-memory pool for tests. One connection means the
/// database lives exactly as long as the pool.
pub async fn connect_memory() -> Result<DbPool, sqlx::Error> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_owned(),
        max_connections: 1,
        timeout_secs: 5,
        busy_timeout_ms: 5_000,
    })
    .await
}
