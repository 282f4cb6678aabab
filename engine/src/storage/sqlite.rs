//! SQLite key-value backend
//!
//! Stores the collection as one JSON document in a `kv` table, the same
//! whole-document contract a remote key-value store offers. Uses WAL mode
//! so a reader is never blocked by the single writer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sdk::errors::BoardError;
use sdk::types::Item;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::ItemBackend;

/// Key the item collection is stored under
pub const ITEMS_KEY: &str = "board:items";

/// Backend storing the collection in a SQLite key-value table
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (or create) the database and run migrations
    pub async fn connect(db_path: &Path) -> Result<Self> {
        info!("Opening board database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");

        sqlx::raw_sql(include_str!("../../migrations/001_board_kv.sql"))
            .execute(&pool)
            .await
            .context("Failed to execute migration 001_board_kv.sql")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checkpoint the WAL and close all connections
    pub async fn close(self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .context("Failed to flush WAL")?;

        self.pool.close().await;
        info!("Board database closed");
        Ok(())
    }
}

fn unavailable(err: sqlx::Error) -> BoardError {
    BoardError::StorageUnavailable(format!("sqlite: {}", err))
}

#[async_trait]
impl ItemBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self) -> Result<Vec<Item>, BoardError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(ITEMS_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        match value {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                BoardError::StorageUnavailable(format!("sqlite: stored board is corrupt: {}", e))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, items: &[Item]) -> Result<(), BoardError> {
        let json = serde_json::to_string(items)?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(ITEMS_KEY)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }
}
