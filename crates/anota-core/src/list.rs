//! Newest-first listing of the signed-in user's entries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::backend::{Direction, Query, TableStore};
use crate::config::DEFAULT_ENTRIES_TABLE;
use crate::models::{Entry, EntryId};
use crate::notice::Confirm;
use crate::Result;

/// Lines of content shown under each title.
pub const PREVIEW_LINES: usize = 3;
/// Shown in place of a preview when an entry has no content.
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "No content";

/// Generation counter shared by list views and editors.
///
/// Editors bump it after a successful commit; a list that loaded an older
/// generation reports itself stale.
#[derive(Debug, Clone, Default)]
pub struct ListInvalidation(Arc<AtomicU64>);

impl ListInvalidation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn generation(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

pub struct EntryListView<B: TableStore + ?Sized> {
    backend: Arc<B>,
    table: String,
    invalidation: ListInvalidation,
    entries: Vec<Entry>,
    loaded_generation: Option<u64>,
}

impl<B: TableStore + ?Sized> EntryListView<B> {
    pub fn new(backend: Arc<B>, invalidation: ListInvalidation) -> Self {
        Self {
            backend,
            table: DEFAULT_ENTRIES_TABLE.to_string(),
            invalidation,
            entries: Vec::new(),
            loaded_generation: None,
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Entries from the last successful load, newest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Whether an editor committed since the last load, or nothing was loaded yet.
    pub fn is_stale(&self) -> bool {
        self.loaded_generation != Some(self.invalidation.generation())
    }

    /// Fetch every visible entry, newest first.
    ///
    /// Rows that do not map to an entry are skipped with a warning. On
    /// failure the previously loaded entries are kept.
    pub async fn load(&mut self) -> Result<&[Entry]> {
        let generation = self.invalidation.generation();
        let query = Query::new().order_by("created_at", Direction::Descending);
        let rows = self.backend.select(&self.table, &query).await?;

        let mut entries = rows
            .into_iter()
            .filter_map(|row| match Entry::from_row(row) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!("Skipping entry row: {}", error);
                    None
                }
            })
            .collect::<Vec<_>>();
        entries.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        tracing::debug!("Loaded {} entries", entries.len());
        self.entries = entries;
        self.loaded_generation = Some(generation);
        Ok(&self.entries)
    }

    pub async fn refresh(&mut self) -> Result<&[Entry]> {
        self.load().await
    }

    /// Reload when the view becomes visible again.
    pub async fn on_focus(&mut self) -> Result<&[Entry]> {
        self.load().await
    }

    /// Delete an entry after the user confirms, then reload.
    ///
    /// Returns `false` when the user declined; nothing is sent in that case.
    /// A failed reload after a successful delete is logged and leaves the
    /// list stale with the deleted entry already removed.
    pub async fn delete(&mut self, id: &EntryId, confirm: &dyn Confirm) -> Result<bool> {
        let title = self
            .entries
            .iter()
            .find(|entry| &entry.id == id)
            .map_or_else(|| id.to_string(), |entry| entry.display_title().to_string());
        if !confirm.confirm(&format!("Delete \"{title}\"?")) {
            return Ok(false);
        }

        self.backend
            .delete(&self.table, &Query::new().eq("id", Value::from(id)))
            .await?;
        tracing::info!("Deleted entry {}", id);
        self.entries.retain(|entry| &entry.id != id);

        if let Err(error) = self.load().await {
            tracing::warn!("Failed to reload entries after delete: {}", error);
            self.loaded_generation = None;
        }
        Ok(true)
    }
}

/// Render a timestamp as `dd/mm/yyyy HH:MM` in `zone`.
pub fn format_entry_date<Tz>(created_at: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    created_at
        .with_timezone(zone)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// Content preview for list rows, with a placeholder for empty entries.
pub fn preview_text(entry: &Entry) -> String {
    entry
        .content_preview(PREVIEW_LINES)
        .unwrap_or_else(|| EMPTY_CONTENT_PLACEHOLDER.to_string())
}
