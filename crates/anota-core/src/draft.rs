//! Editable, uncommitted state of an entry.

use crate::models::{Entry, EntryId, EntryRecord, MAX_CONTENT_CHARS, MAX_TITLE_CHARS};
use crate::util::clamp_chars;
use crate::{Error, Result};

/// Fields being edited, plus the values they were opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    id: Option<EntryId>,
    title: String,
    content: String,
    media_url: Option<String>,
    saved: Snapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Snapshot {
    title: String,
    content: String,
    media_url: Option<String>,
}

impl Draft {
    /// An empty draft for a new entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft pre-filled from an existing entry; commits update that entry.
    #[must_use]
    pub fn from_entry(entry: &Entry) -> Self {
        let title = clamp_chars(&entry.title, MAX_TITLE_CHARS);
        let content = clamp_chars(&entry.content, MAX_CONTENT_CHARS);
        let media_url = entry.media_url.clone();
        Self {
            id: Some(entry.id.clone()),
            saved: Snapshot {
                title: title.clone(),
                content: content.clone(),
                media_url: media_url.clone(),
            },
            title,
            content,
            media_url,
        }
    }

    pub const fn id(&self) -> Option<&EntryId> {
        self.id.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }

    /// Replace the title, keeping at most 100 characters.
    pub fn set_title(&mut self, title: &str) {
        self.title = clamp_chars(title, MAX_TITLE_CHARS);
    }

    /// Replace the content, keeping at most 2000 characters.
    pub fn set_content(&mut self, content: &str) {
        self.content = clamp_chars(content, MAX_CONTENT_CHARS);
    }

    pub fn attach_media(&mut self, url: impl Into<String>) {
        self.media_url = Some(url.into());
    }

    pub fn clear_media(&mut self) {
        self.media_url = None;
    }

    /// `(used, limit)` character counter for the title.
    pub fn title_len(&self) -> (usize, usize) {
        (self.title.chars().count(), MAX_TITLE_CHARS)
    }

    /// `(used, limit)` character counter for the content.
    pub fn content_len(&self) -> (usize, usize) {
        (self.content.chars().count(), MAX_CONTENT_CHARS)
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// Whether any field differs from what the draft was opened with or last saved as.
    pub fn has_unsaved_changes(&self) -> bool {
        self.title != self.saved.title
            || self.content != self.saved.content
            || self.media_url != self.saved.media_url
    }

    /// Record the values of `committed` as the saved state.
    ///
    /// Edits made after `committed` was taken stay unsaved.
    pub fn accept_saved(&mut self, committed: &Self) {
        self.saved = Snapshot {
            title: committed.title.clone(),
            content: committed.content.clone(),
            media_url: committed.media_url.clone(),
        };
    }

    /// Build the upsert payload for `owner`.
    ///
    /// Fails with [`Error::EmptyDraft`] when both title and content are blank.
    pub fn to_record(&self, owner: &str) -> Result<EntryRecord> {
        if self.is_empty() {
            return Err(Error::EmptyDraft);
        }
        if owner.trim().is_empty() {
            return Err(Error::MissingOwner);
        }

        Ok(EntryRecord {
            id: self.id.clone(),
            user_id: owner.to_string(),
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            media_url: self.media_url.clone(),
        })
    }
}
