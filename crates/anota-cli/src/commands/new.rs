use std::path::Path;
use std::sync::Arc;

use anota_core::notice::SAVE_FAILED_MESSAGE;
use anota_core::{Backend, CommitOutcome, EntryEditor, Error, ListInvalidation};

use crate::auth::ProfileBackend;
use crate::commands::common::{
    attach_media_file, capture_editor_input_with_initial, commit_entry, open_session,
    read_piped_stdin, split_entry_text,
};
use crate::error::CliError;

pub async fn run_new(
    title: Option<String>,
    content: Option<String>,
    media: Option<&Path>,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let (title, content) = resolve_entry_text(title, content)?;

    let opened = ProfileBackend::open(profile)?;
    let editor = EntryEditor::new(Arc::new(opened.backend), ListInvalidation::new())
        .with_config(&opened.config);
    create_entry(&editor, &title, &content, media).await?;

    println!("Created entry");
    Ok(())
}

/// Fill a new draft, attach `media`, and commit it.
///
/// An empty draft is rejected before anything is uploaded.
pub async fn create_entry<B>(
    editor: &EntryEditor<B>,
    title: &str,
    content: &str,
    media: Option<&Path>,
) -> Result<CommitOutcome, CliError>
where
    B: Backend + ?Sized,
{
    open_session(editor).await?;
    editor.set_title(title)?;
    editor.set_content(content)?;

    if editor.draft()?.is_empty() {
        return Err(CliError::notice(&Error::EmptyDraft, SAVE_FAILED_MESSAGE));
    }
    if let Some(path) = media {
        attach_media_file(editor, path).await?;
    }
    commit_entry(editor).await
}

/// Title and text from flags, else piped stdin, else `$EDITOR`.
pub fn resolve_entry_text(
    title: Option<String>,
    content: Option<String>,
) -> Result<(String, String), CliError> {
    if title.is_some() || content.is_some() {
        return Ok((title.unwrap_or_default(), content.unwrap_or_default()));
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(split_entry_text(&text));
    }

    Ok(capture_editor_input_with_initial("")?
        .map(|text| split_entry_text(&text))
        .unwrap_or_default())
}
