use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

/// Pool size used by [`Database::open`].
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

/// Accepts either a bare path (`feeds.db`, `:memory:`) or a full `sqlite:` URL.
fn connection_url(location: &str) -> String {
    if location.starts_with("sqlite:") {
        location.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", location)
    }
}

impl Database {
    /// Open a database with the default pool size and run migrations
    pub async fn open(location: &str) -> Result<Self, DatabaseError> {
        Self::open_with(location, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Open a database connection pool and run migrations
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if the file is locked by another
    /// process (SQLITE_BUSY, SQLITE_LOCKED). A path that cannot be opened is
    /// `DatabaseError::Other`.
    /// Returns `DatabaseError::Migration` if the schema cannot be created.
    pub async fn open_with(location: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let url = connection_url(location);

        // SEC-010: Pre-create the database file with owner-only permissions
        #[cfg(unix)]
        if !location.starts_with("sqlite:") && location != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(location);
            if !db_path.exists() {
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // If creation fails, SQLite will report the error at connect_with.
            }
        }

        // busy_timeout=5000: concurrent writers wait up to 5 seconds for the
        // write lock instead of failing with SQLITE_BUSY. Set through the
        // connect options so every pooled connection inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .foreign_keys(true)
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        tracing::debug!(location = %location, max_connections, "Database ready");
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Feeds are keyed by their title; `id` is the Atom identifier
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS atom_feed (
                id TEXT PRIMARY KEY,
                title TEXT UNIQUE NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Entries reference their feed by title, not by id
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS atom_entry (
                id TEXT PRIMARY KEY,
                feed_title TEXT NOT NULL REFERENCES atom_feed(title),
                title TEXT,
                title_type TEXT,
                content TEXT,
                content_type TEXT,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Covers list_entries(): WHERE feed_title = ? ORDER BY created_at
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_atom_entry_feed_created ON atom_entry(feed_title, created_at)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url_from_path() {
        assert_eq!(connection_url("feeds.db"), "sqlite:feeds.db?mode=rwc");
        assert_eq!(connection_url(":memory:"), "sqlite::memory:?mode=rwc");
    }

    #[test]
    fn test_connection_url_passthrough() {
        assert_eq!(connection_url("sqlite://data/feeds.db"), "sqlite://data/feeds.db");
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        db.migrate().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'atom_%' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["atom_entry", "atom_feed"]);
    }

    #[tokio::test]
    async fn test_open_missing_directory_is_not_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("feeds.db");
        let err = Database::open(path.to_str().unwrap()).await.err().unwrap();
        assert!(matches!(err, DatabaseError::Other(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_open_file_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.db");
        let path = path.to_str().unwrap();

        let first = Database::open(path).await.unwrap();
        first.create_feed_if_absent("persisted").await.unwrap();
        first.pool.close().await;

        let second = Database::open(path).await.unwrap();
        assert!(second.find_feed_by_title("persisted").await.unwrap().is_some());
    }
}
