use std::sync::Arc;

use anota_core::notice::{DELETE_FAILED_MESSAGE, LIST_FAILED_MESSAGE};
use anota_core::{EntryListView, ListInvalidation};

use crate::auth::ProfileBackend;
use crate::commands::common::{prompt_confirmation, resolve_entry};
use crate::error::CliError;

pub async fn run_delete(id: &str, yes: bool, profile: Option<&str>) -> Result<(), CliError> {
    let opened = ProfileBackend::open(profile)?;
    let mut view = EntryListView::new(Arc::new(opened.backend), ListInvalidation::new())
        .with_table(opened.config.entries_table);
    let entries = view
        .load()
        .await
        .map_err(|error| CliError::notice(&error, LIST_FAILED_MESSAGE))?;
    let entry_id = resolve_entry(id, entries)?.id.clone();

    let confirm = |prompt: &str| yes || prompt_confirmation(prompt);
    let deleted = view
        .delete(&entry_id, &confirm)
        .await
        .map_err(|error| CliError::notice(&error, DELETE_FAILED_MESSAGE))?;

    if deleted {
        println!("{entry_id}");
    } else {
        println!("Cancelled");
    }
    Ok(())
}
