use std::env;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use anota_core::list::{format_entry_date, preview_text};
use anota_core::media::FileMediaSource;
use anota_core::notice::{AUTH_FAILED_MESSAGE, SAVE_FAILED_MESSAGE, UPLOAD_FAILED_MESSAGE};
use anota_core::{Backend, CommitOutcome, Entry, EntryEditor, EntryId};
use chrono::Local;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub preview: String,
    pub media_url: Option<String>,
    pub created_at: String,
    pub date: String,
}

/// Find an entry by exact ID or unique ID prefix.
pub fn resolve_entry<'a>(query: &str, entries: &'a [Entry]) -> Result<&'a Entry, CliError> {
    let query = normalize_entry_identifier(query)?;
    if let Some(entry) = entries.iter().find(|entry| entry.id.to_string() == query) {
        return Ok(entry);
    }

    let matches = entries
        .iter()
        .filter(|entry| entry.id.to_string().starts_with(&query))
        .collect::<Vec<_>>();
    match matches.as_slice() {
        [] => Err(CliError::EntryNotFound(query)),
        [entry] => Ok(*entry),
        _ => {
            let options = matches
                .iter()
                .take(3)
                .map(|entry| short_id(&entry.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &EntryId) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        let media = if entry.media_url.is_some() { "  [media]" } else { "" };
        lines.push(format!(
            "{:<13}  {}  {}{media}",
            short_id(&entry.id),
            format_entry_date(&entry.created_at, &Local),
            entry.display_title()
        ));
        lines.extend(preview_text(entry).lines().map(|line| format!("    {line}")));
    }
    lines
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    EntryListItem {
        id: entry.id.to_string(),
        title: entry.title.clone(),
        content: entry.content.clone(),
        preview: preview_text(entry),
        media_url: entry.media_url.clone(),
        created_at: entry.created_at.to_rfc3339(),
        date: format_entry_date(&entry.created_at, &Local),
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_entry_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEntryId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Editor buffer layout: title on the first line, a blank line, then the text.
pub fn compose_entry_text(title: &str, content: &str) -> String {
    format!("{title}\n\n{content}")
}

pub fn split_entry_text(text: &str) -> (String, String) {
    let mut lines = text.lines();
    let title = lines.next().unwrap_or_default().trim().to_string();
    let content = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (title, content)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Ask a yes/no question on the terminal; anything but `y`/`yes` declines.
pub fn prompt_confirmation(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_entry_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let entry_text = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&entry_text))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_entry_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("anota-entry-{}-{now}.md", std::process::id()))
}

/// Upload the file at `path` and attach it to the editor's draft.
pub async fn attach_media_file<B>(editor: &EntryEditor<B>, path: &Path) -> Result<(), CliError>
where
    B: Backend + ?Sized,
{
    let source = FileMediaSource::new(path);
    match editor.attach_media(&source).await {
        Ok(Some(url)) => {
            tracing::debug!("Media available at {}", url);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(error) => Err(CliError::notice(&error, UPLOAD_FAILED_MESSAGE)),
    }
}

pub async fn commit_entry<B>(editor: &EntryEditor<B>) -> Result<CommitOutcome, CliError>
where
    B: Backend + ?Sized,
{
    editor
        .commit()
        .await
        .map_err(|error| CliError::notice(&error, SAVE_FAILED_MESSAGE))
}

/// Resolve the signed-in user for `editor`.
pub async fn open_session<B>(editor: &EntryEditor<B>) -> Result<Option<String>, CliError>
where
    B: Backend + ?Sized,
{
    editor.on_focus().await.map_err(|error| session_error(&error))
}

/// Failures while restoring the stored session.
pub fn session_error(error: &anota_core::Error) -> CliError {
    CliError::notice(error, AUTH_FAILED_MESSAGE)
}
