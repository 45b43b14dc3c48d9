use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    FromRow, SqlitePool,
};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    pub published: String,
    pub trading_decision: String,
}

/// A record as submitted to the ingestion endpoint, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSubmission {
    pub title: String,
    pub published: String,
    pub trading_decision: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let mut options =
            SqliteConnectOptions::from_str(database_url)?.busy_timeout(Duration::from_secs(5));

        // Every connection to `sqlite::memory:` opens its own database, so an
        // in-memory store must live on exactly one connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                published TEXT NOT NULL,
                trading_decision TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a record and return its id. The row is committed when this returns.
    pub async fn append(&self, news: &NewsSubmission) -> anyhow::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO news (title, published, trading_decision)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&news.title)
        .bind(&news.published)
        .bind(&news.trading_decision)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Highest id in the store, 0 when empty.
    pub async fn max_id(&self) -> anyhow::Result<i64> {
        let max: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(id), 0) FROM news")
            .fetch_one(&self.pool)
            .await?;
        Ok(max.0)
    }

    /// All records, newest first.
    pub async fn list_all(&self) -> anyhow::Result<Vec<NewsRecord>> {
        let records = sqlx::query_as::<_, NewsRecord>(
            "SELECT id, title, published, trading_decision FROM news ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
