use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::models::greeting::DEFAULT_GREETINGS;

const DEFAULT_POOL_SIZE: u32 = 10;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        image_path TEXT NOT NULL,
        category TEXT NOT NULL,
        signature_x INTEGER DEFAULT 100,
        signature_y INTEGER DEFAULT 100,
        signature_font TEXT DEFAULT 'Arial',
        signature_color TEXT DEFAULT '#000000',
        signature_size INTEGER DEFAULT 50,
        is_active INTEGER DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL,
        user_name TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY(card_id) REFERENCES cards(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS greetings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL UNIQUE
    )
    "#,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Handle to the SQLite store holding cards, greetings and the usage log.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if missing) the database at `url`.
    ///
    /// Foreign keys are not enforced: deleting a card leaves its usage rows
    /// pointing at the removed id.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        info!("Connecting to SQLite at {url}...");

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(false);

        // Each in-memory connection is its own database unless they share one.
        let pool_size = if url.contains(":memory:") {
            1
        } else {
            DEFAULT_POOL_SIZE
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        info!("SQLite pool established (pool size: {pool_size})");
        Ok(Self { pool })
    }

    /// Creates any missing tables and seeds the default greetings the first
    /// time the greetings table is empty. Safe to call on every startup.
    pub async fn initialize(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        let greeting_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM greetings")
            .fetch_one(&mut *tx)
            .await?;

        if greeting_count == 0 {
            for text in DEFAULT_GREETINGS {
                sqlx::query("INSERT INTO greetings (text) VALUES (?)")
                    .bind(text)
                    .execute(&mut *tx)
                    .await?;
            }
            info!("Seeded {} default greetings", DEFAULT_GREETINGS.len());
        }

        tx.commit().await?;
        info!("Database initialized");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    let store = Store::connect("sqlite::memory:").await.unwrap();
    store.initialize().await.unwrap();
    store
}
