//! Feed service: the two user-facing operations.
//!
//! [`FeedService`] owns the get-or-create protocol and classifies every
//! failure into a [`ServiceError`] the HTTP layer can map to a status code.
//! Store failures are wrapped with context for logging and never shown to
//! clients verbatim.

use anyhow::Context;
use thiserror::Error;

use crate::feed::{decode_entry, DecodeError, Entry, Feed};
use crate::storage::FeedStore;
use crate::util::new_id;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested feed does not exist (read path only).
    #[error("No such feed")]
    NotFound(String),

    /// The feed title in the request is blank.
    #[error("feed title must not be empty")]
    InvalidTitle,

    /// The entry document could not be decoded.
    #[error("could not parse xml: {0}")]
    Decode(#[from] DecodeError),

    /// Store or connectivity failure; the detail is for logs only.
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

pub struct FeedService<S> {
    store: S,
}

impl<S: FeedStore> FeedService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The backing store, for diagnostics such as row counts. Requests never
    /// go through it directly.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a feed with all of its entries.
    ///
    /// Never creates a feed: an unknown title is `ServiceError::NotFound`.
    pub async fn get_feed(&self, title: &str) -> Result<Feed, ServiceError> {
        let mut feed = self
            .store
            .find_feed_by_title(title)
            .await
            .with_context(|| format!("Failed to get feed '{}'", title))
            .map_err(ServiceError::Internal)?
            .ok_or_else(|| ServiceError::NotFound(title.to_string()))?;

        feed.entries = self
            .store
            .list_entries(title)
            .await
            .with_context(|| format!("Failed to construct feed '{}'", title))
            .map_err(ServiceError::Internal)?;

        tracing::debug!(feed = %title, entries = feed.entries.len(), "Assembled feed");
        Ok(feed)
    }

    /// Decode an entry document and append it to `feed_title`, creating the
    /// feed first if it does not exist.
    ///
    /// Decoding happens before any store access, so a malformed document
    /// leaves the database untouched. Type defaults were already applied by
    /// the decoder.
    pub async fn add_entry(&self, feed_title: &str, raw: &[u8]) -> Result<Entry, ServiceError> {
        if feed_title.trim().is_empty() {
            return Err(ServiceError::InvalidTitle);
        }

        let mut entry = decode_entry(raw)?;

        let feed = self
            .store
            .create_feed_if_absent(feed_title)
            .await
            .with_context(|| format!("Failed to create feed '{}'", feed_title))
            .map_err(ServiceError::Internal)?;

        entry.id = new_id();
        entry.feed_title = feed.title;

        let stored = self
            .store
            .insert_entry(&entry)
            .await
            .with_context(|| format!("Failed to save entry in feed '{}'", feed_title))
            .map_err(ServiceError::Internal)?;

        tracing::info!(feed = %feed_title, entry = %stored.id, "Entry added");
        Ok(stored)
    }
}
