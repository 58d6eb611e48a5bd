/// Value of the `type` attribute when a document leaves it out.
pub const DEFAULT_TEXT_TYPE: &str = "text";

/// Text construct shared by entry titles and contents.
///
/// `kind` is serialized as the Atom `type` attribute (`text`, `html`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub raw: String,
    pub kind: String,
}

impl Text {
    /// Plain text with the default `text` type.
    pub fn plain(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            kind: DEFAULT_TEXT_TYPE.to_string(),
        }
    }

    pub fn with_kind(raw: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            kind: kind.into(),
        }
    }
}

/// A single entry belonging to exactly one feed.
///
/// `id` and `feed_title` are empty on a freshly decoded entry that has not
/// been stored yet; the service fills both before insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub feed_title: String,
    pub title: Text,
    pub content: Text,
}

/// A named collection of entries, keyed by its unique title.
///
/// `entries` is only populated when the feed is assembled for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub entries: Vec<Entry>,
}

impl Feed {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            entries: Vec::new(),
        }
    }
}
