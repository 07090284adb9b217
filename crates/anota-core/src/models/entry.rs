//! Entry model and the mapping from backend rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 100;
/// Maximum content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Opaque identifier assigned by the backend on first insert.
///
/// Tables may key entries by UUID text or by an integer sequence; the wire
/// form is kept so an update is sent back exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Number(i64),
    Text(String),
}

impl EntryId {
    /// Parse user input into an ID, preferring the integer form when it fits.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(
            raw.parse::<i64>()
                .map_or_else(|_| Self::Text(raw.to_string()), Self::Number),
        )
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&EntryId> for Value {
    fn from(value: &EntryId) -> Self {
        match value {
            EntryId::Number(number) => Self::from(*number),
            EntryId::Text(text) => Self::from(text.as_str()),
        }
    }
}

/// A persisted journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Backend-assigned identifier
    pub id: EntryId,
    /// Authenticated user that created the entry
    #[serde(rename = "user_id")]
    pub owner: String,
    /// Title, up to 100 characters
    pub title: String,
    /// Body text, up to 2000 characters
    pub content: String,
    /// Public URL of the attached image or video
    pub media_url: Option<String>,
    /// Insert timestamp assigned by the backend
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Map a loosely typed backend row into an entry.
    ///
    /// `id`, `user_id`, and `created_at` are required. Null text columns read
    /// as empty strings and an empty `media_url` reads as no attachment.
    pub fn from_row(row: Value) -> Result<Self> {
        let row: EntryRow = serde_json::from_value(row)
            .map_err(|error| Error::InvalidRecord(error.to_string()))?;

        let id = row
            .id
            .ok_or_else(|| Error::InvalidRecord("entry row is missing `id`".to_string()))?;
        let owner = row
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidRecord(format!("entry {id} is missing `user_id`")))?;
        let created_at = row
            .created_at
            .ok_or_else(|| Error::InvalidRecord(format!("entry {id} is missing `created_at`")))?;

        Ok(Self {
            id,
            owner,
            title: row.title.unwrap_or_default(),
            content: row.content.unwrap_or_default(),
            media_url: row.media_url.filter(|value| !value.trim().is_empty()),
            created_at,
        })
    }

    /// Title to show in lists; empty titles render as a placeholder.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "(untitled)"
        } else {
            &self.title
        }
    }

    /// First `max_lines` lines of content, or `None` when there is no content.
    #[must_use]
    pub fn content_preview(&self, max_lines: usize) -> Option<String> {
        if self.content.trim().is_empty() {
            return None;
        }
        let mut lines = self.content.lines();
        let mut preview = lines.by_ref().take(max_lines).collect::<Vec<_>>().join("\n");
        if lines.next().is_some() {
            preview.push_str("...");
        }
        Some(preview)
    }
}

/// Row shape read from the `entries` table.
#[derive(Debug, Deserialize)]
struct EntryRow {
    #[serde(default)]
    id: Option<EntryId>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    media_url: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Payload written by a commit.
///
/// `id` is omitted for new entries so the backend assigns one; `media_url`
/// is always sent so clearing an attachment reaches the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
}
