//! Database connection management

use anyhow::{Context, Result};
use backstage_config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Prepare and establish a database connection pool.
///
/// Every pooled connection gets foreign keys, WAL and a busy timeout.
pub async fn prepare_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    ensure_sqlite_directory(&config.url).await?;

    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("invalid database url {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database {}", config.url))?;

    info!(url = %config.url, "database connection established");
    Ok(pool)
}

/// Ensure the directory holding the SQLite file exists
async fn ensure_sqlite_directory(url: &str) -> Result<()> {
    let Some(sqlite_path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return Ok(());
    };

    let sqlite_path = sqlite_path.split('?').next().unwrap_or_default();
    if sqlite_path.is_empty() || sqlite_path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create sqlite directory {}", parent.display())
            })?;
        }
    }

    Ok(())
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("failed to test database connection")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_missing_directories_for_file_databases() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/dir/test.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = prepare_database(&config).await.unwrap();
        ping(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn foreign_keys_are_enabled_on_pooled_connections() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("fk.db").display()),
            max_connections: 2,
        };

        let pool = prepare_database(&config).await.unwrap();
        let (enabled,): (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(enabled);
    }
}
