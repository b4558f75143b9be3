use std::sync::Arc;

use sharelist_core::models::DEFAULT_LIST_TITLE;
use sharelist_core::storage::{Persistent, SharedStorage};
use sharelist_core::stores::{FavoritesStore, HistoryStore, LAST_SEEN_KEY};
use sharelist_core::util::unix_millis_now;
use sharelist_core::{ListEntry, ListId};

use crate::cli::{FavoritesCommands, HistoryCommands};
use crate::commands::common::format_relative_time;
use crate::error::CliError;

pub fn run_history(
    command: Option<HistoryCommands>,
    storage: &SharedStorage,
) -> Result<(), CliError> {
    let history = HistoryStore::open(Arc::clone(storage));

    match command.unwrap_or(HistoryCommands::List { json: false }) {
        HistoryCommands::List { json } => {
            let last_seen = Persistent::open(Arc::clone(storage), LAST_SEEN_KEY, 0_i64).get();
            print_entries(&history.entries(), json)?;
            if !json && last_seen > 0 {
                println!(
                    "Last session: {}",
                    format_relative_time(last_seen, unix_millis_now())
                );
            }
        }
        HistoryCommands::Remove { id } => {
            let list_id = ListId::from(id.trim());
            history.remove(&list_id);
            println!("{list_id}");
        }
        HistoryCommands::Clear => {
            history.clear();
            println!("History cleared");
        }
    }
    Ok(())
}

pub fn run_favorites(
    command: Option<FavoritesCommands>,
    current_list: Option<ListId>,
    storage: &SharedStorage,
) -> Result<(), CliError> {
    let favorites = FavoritesStore::open(Arc::clone(storage));

    match command.unwrap_or(FavoritesCommands::List { json: false }) {
        FavoritesCommands::List { json } => print_entries(&favorites.entries(), json)?,
        FavoritesCommands::Add { id } => {
            let list_id = target_list(id, current_list)?;
            let title = known_title(&list_id, storage);
            favorites.add(&list_id, &title);
            println!("{list_id}");
        }
        FavoritesCommands::Remove { id } => {
            let list_id = target_list(id, current_list)?;
            favorites.remove(&list_id);
            println!("{list_id}");
        }
    }
    Ok(())
}

fn target_list(id: Option<String>, current_list: Option<ListId>) -> Result<ListId, CliError> {
    id.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(ListId::from)
        .or(current_list)
        .ok_or(CliError::NoListSelected)
}

/// Title last seen for a list in history, or the default title
fn known_title(list_id: &ListId, storage: &SharedStorage) -> String {
    HistoryStore::open(Arc::clone(storage))
        .entries()
        .into_iter()
        .find(|entry| &entry.id == list_id)
        .map_or_else(|| DEFAULT_LIST_TITLE.to_string(), |entry| entry.title)
}

pub fn format_entry_lines(entries: &[ListEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| format!("{:<36}  {}", entry.id.as_str(), entry.title))
        .collect()
}

fn print_entries(entries: &[ListEntry], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No lists");
        return Ok(());
    }
    for line in format_entry_lines(entries) {
        println!("{line}");
    }
    Ok(())
}
