use std::path::Path;
use std::sync::Arc;

use anota_core::notice::{LIST_FAILED_MESSAGE, SAVE_FAILED_MESSAGE};
use anota_core::{EntryEditor, EntryListView, Error, ListInvalidation};

use crate::auth::ProfileBackend;
use crate::commands::common::{
    attach_media_file, capture_editor_input_with_initial, commit_entry, compose_entry_text,
    open_session, resolve_entry, split_entry_text,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    content: Option<String>,
    media: Option<&Path>,
    clear_media: bool,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let opened = ProfileBackend::open(profile)?;
    let backend = Arc::new(opened.backend);
    let invalidation = ListInvalidation::new();

    let mut view = EntryListView::new(Arc::clone(&backend), invalidation.clone())
        .with_table(opened.config.entries_table.clone());
    let entries = view
        .load()
        .await
        .map_err(|error| CliError::notice(&error, LIST_FAILED_MESSAGE))?;
    let entry = resolve_entry(id, entries)?.clone();

    let editor = EntryEditor::editing(backend, invalidation, &entry).with_config(&opened.config);
    open_session(&editor).await?;

    let interactive = title.is_none() && content.is_none() && media.is_none() && !clear_media;
    if interactive {
        let initial = compose_entry_text(&entry.title, &entry.content);
        let Some(text) = capture_editor_input_with_initial(&initial)? else {
            return Err(CliError::notice(&Error::EmptyDraft, SAVE_FAILED_MESSAGE));
        };
        let (title, content) = split_entry_text(&text);
        editor.set_title(&title)?;
        editor.set_content(&content)?;
    } else {
        if let Some(title) = title {
            editor.set_title(&title)?;
        }
        if let Some(content) = content {
            editor.set_content(&content)?;
        }
    }

    if clear_media {
        editor.remove_media()?;
    }
    if let Some(path) = media {
        attach_media_file(&editor, path).await?;
    }

    if editor.draft()?.has_unsaved_changes() {
        commit_entry(&editor).await?;
    }
    println!("{}", entry.id);
    Ok(())
}
