use std::sync::Arc;

use anota_core::notice::LIST_FAILED_MESSAGE;
use anota_core::{EntryListView, ListInvalidation};

use crate::auth::ProfileBackend;
use crate::commands::common::{entry_to_list_item, format_entry_lines, EntryListItem};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, profile: Option<&str>) -> Result<(), CliError> {
    let opened = ProfileBackend::open(profile)?;
    let mut view = EntryListView::new(Arc::new(opened.backend), ListInvalidation::new())
        .with_table(opened.config.entries_table);
    let entries = view
        .load()
        .await
        .map_err(|error| CliError::notice(&error, LIST_FAILED_MESSAGE))?;
    let entries = &entries[..limit.min(entries.len())];

    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if entries.is_empty() {
        println!("No entries yet. Create one with `anota new`.");
    } else {
        for line in format_entry_lines(entries) {
            println!("{line}");
        }
    }

    Ok(())
}
