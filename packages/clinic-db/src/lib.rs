//! Clinic DB - shared data layer for the dental clinic back office
//!
//! This library provides:
//! - Shared data models (patients, appointments, bills, payments, service templates)
//! - Automatic database migrations
//! - Repository functions for each entity
//! - Connection pool setup for SQLite

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod appointments;
pub mod bills;
pub mod error;
pub mod migrations;
pub mod models;
pub mod patients;
pub mod payments;
pub mod service_templates;

pub use error::DbError;

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite file
    pub db_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/clinic.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Opens the SQLite pool and applies pending migrations
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Failed to create the database directory")?;
        }
    }

    let connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Failed to connect to the SQLite database")?;

    migrations::run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    info!("Database ready: {}", config.db_path);
    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
#[cfg(any(test, feature = "test-utils"))]
pub async fn memory_pool() -> Result<SqlitePool> {
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    // Every connection to :memory: is a separate database, so keep exactly one alive
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("Failed to open in-memory database")?;
    migrations::run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_db_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");

        let config = DbConfig {
            db_path: db_path.to_string_lossy().into_owned(),
            max_connections: 2,
        };

        let pool = init_db_pool(&config).await?;

        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
        assert_eq!(result.0, 1);
        assert!(db_path.exists());

        Ok(())
    }
}
