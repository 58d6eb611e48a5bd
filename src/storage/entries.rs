use super::schema::Database;
use super::types::{DatabaseError, EntryDbRow};
use crate::feed::Entry;

impl Database {
    // ========================================================================
    // Entry Operations
    // ========================================================================

    /// All entries of a feed in insertion order.
    ///
    /// Ties on `created_at` (same millisecond) fall back to `rowid`, which
    /// SQLite assigns in increasing order on insert.
    pub async fn list_entries(&self, feed_title: &str) -> Result<Vec<Entry>, DatabaseError> {
        let rows = sqlx::query_as::<_, EntryDbRow>(
            r#"
            SELECT id, feed_title, title, title_type, content, content_type
            FROM atom_entry
            WHERE feed_title = ?
            ORDER BY created_at ASC, rowid ASC
        "#,
        )
        .bind(feed_title)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntryDbRow::into_entry).collect())
    }

    /// Persist a fully populated entry.
    ///
    /// The owning feed must already exist; the foreign key on `feed_title`
    /// rejects orphans, as does the primary key a duplicate id.
    pub async fn insert_entry(&self, entry: &Entry) -> Result<Entry, DatabaseError> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO atom_entry
                (id, feed_title, title, title_type, content, content_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&entry.id)
        .bind(&entry.feed_title)
        .bind(&entry.title.raw)
        .bind(&entry.title.kind)
        .bind(&entry.content.raw)
        .bind(&entry.content.kind)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(entry.clone())
    }
}
