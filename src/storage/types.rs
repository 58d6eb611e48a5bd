use thiserror::Error;

use crate::feed::{Entry, Text, DEFAULT_TEXT_TYPE};

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("Database is locked by another process")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, separating lock contention from everything else
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::Locked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) messages. SQLITE_CANTOPEN (14) is
/// a path or permission problem and stays `DatabaseError::Other`.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for `atom_entry` queries.
///
/// Text columns are nullable in the schema; missing types fall back to
/// `"text"` and missing text to the empty string.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryDbRow {
    pub id: String,
    pub feed_title: String,
    pub title: Option<String>,
    pub title_type: Option<String>,
    pub content: Option<String>,
    pub content_type: Option<String>,
}

impl EntryDbRow {
    pub(crate) fn into_entry(self) -> Entry {
        Entry {
            id: self.id,
            feed_title: self.feed_title,
            title: text_from_columns(self.title, self.title_type),
            content: text_from_columns(self.content, self.content_type),
        }
    }
}

fn text_from_columns(raw: Option<String>, kind: Option<String>) -> Text {
    Text {
        raw: raw.unwrap_or_default(),
        kind: kind.unwrap_or_else(|| DEFAULT_TEXT_TYPE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_messages_classified() {
        assert!(is_lock_message("error returned from database: (code: 5) database is locked"));
        assert!(!is_lock_message(
            "error returned from database: (code: 14) unable to open database file"
        ));
        assert!(!is_lock_message("UNIQUE constraint failed: atom_entry.id"));
    }

    #[test]
    fn test_null_columns_fall_back_to_defaults() {
        let row = EntryDbRow {
            id: "urn:uuid:1".to_string(),
            feed_title: "tech".to_string(),
            title: Some("Hello".to_string()),
            title_type: None,
            content: None,
            content_type: Some("html".to_string()),
        };
        let entry = row.into_entry();
        assert_eq!(entry.title, Text::plain("Hello"));
        assert_eq!(entry.content, Text::with_kind("", "html"));
    }
}
