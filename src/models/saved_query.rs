use serde::{Deserialize, Serialize};

/// A query expression string persisted as a directory bookmark.
///
/// Saved queries are materialized bookmarks, not cached results: the
/// directory contents are recomputed on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    text: String,
}

impl SavedQuery {
    /// Creates a new saved query.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the literal query text.
    pub fn text(&self) -> &str {
        &self.text
    }
}
