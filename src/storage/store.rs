use std::future::Future;

use super::schema::Database;
use super::types::DatabaseError;
use crate::feed::{Entry, Feed};

/// Persistence contract the feed service is written against.
///
/// `Database` is the production implementation; tests substitute their own
/// to inject failures. A missing feed is `Ok(None)`, never an error.
pub trait FeedStore: Send + Sync + 'static {
    fn find_feed_by_title(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<Feed>, DatabaseError>> + Send;

    fn list_entries(
        &self,
        feed_title: &str,
    ) -> impl Future<Output = Result<Vec<Entry>, DatabaseError>> + Send;

    /// Atomic get-or-create: at most one feed row per title, even when
    /// called concurrently.
    fn create_feed_if_absent(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Feed, DatabaseError>> + Send;

    fn insert_entry(
        &self,
        entry: &Entry,
    ) -> impl Future<Output = Result<Entry, DatabaseError>> + Send;
}

impl FeedStore for Database {
    async fn find_feed_by_title(&self, title: &str) -> Result<Option<Feed>, DatabaseError> {
        Database::find_feed_by_title(self, title).await
    }

    async fn list_entries(&self, feed_title: &str) -> Result<Vec<Entry>, DatabaseError> {
        Database::list_entries(self, feed_title).await
    }

    async fn create_feed_if_absent(&self, title: &str) -> Result<Feed, DatabaseError> {
        Database::create_feed_if_absent(self, title).await
    }

    async fn insert_entry(&self, entry: &Entry) -> Result<Entry, DatabaseError> {
        Database::insert_entry(self, entry).await
    }
}
