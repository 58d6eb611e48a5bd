use super::schema::Database;
use super::types::DatabaseError;
use crate::feed::Feed;
use crate::util::new_id;

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Look up a feed by its unique title.
    ///
    /// Returns id and title only; entries are fetched with `list_entries`.
    pub async fn find_feed_by_title(&self, title: &str) -> Result<Option<Feed>, DatabaseError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, title FROM atom_feed WHERE title = ?")
                .bind(title)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, title)| Feed::new(id, title)))
    }

    /// Insert a feed row for `title`, or return the existing one.
    ///
    /// A single `INSERT ... ON CONFLICT(title) DO UPDATE ... RETURNING`
    /// statement: the no-op update makes SQLite return the row that already
    /// holds the title, so concurrent callers always observe one row per
    /// title and the freshly generated id is discarded on conflict.
    pub async fn create_feed_if_absent(&self, title: &str) -> Result<Feed, DatabaseError> {
        let (id, title): (String, String) = sqlx::query_as(
            r#"
            INSERT INTO atom_feed (id, title)
            VALUES (?, ?)
            ON CONFLICT(title) DO UPDATE SET title = excluded.title
            RETURNING id, title
        "#,
        )
        .bind(new_id())
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(Feed::new(id, title))
    }

    /// Number of feed rows holding `title` (0 or 1 while the UNIQUE index holds).
    ///
    /// Diagnostic only: the request path never calls it. It lets callers and
    /// tests check that get-or-create left exactly one row behind.
    pub async fn count_feeds_with_title(&self, title: &str) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM atom_feed WHERE title = ?")
            .bind(title)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
