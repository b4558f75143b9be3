use std::sync::Arc;

use serde::Serialize;
use sharelist_core::remote::{ListBackend, TodoBackend};
use sharelist_core::storage::SharedStorage;
use sharelist_core::stores::{DisplaySettings, FavoritesStore, SortSettings};
use sharelist_core::ListId;

use crate::commands::common::{format_task_lines, normalize_title, task_to_list_item, Session, TaskListItem};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ListView {
    id: String,
    title: String,
    favorite: bool,
    tasks: Vec<TaskListItem>,
}

/// Start a fresh list under a generated id and make it the current one
pub async fn run_new<B>(
    backend: B,
    auto_provision: bool,
    storage: SharedStorage,
    title_parts: &[String],
) -> Result<Session<B>, CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let list_id = ListId::generate();
    let session = Session::open(backend, auto_provision, storage, &list_id).await?;

    if let Some(title) = normalize_title(title_parts) {
        apply_title(&session, &title).await?;
    }

    println!("{list_id}");
    Ok(session)
}

pub fn run_show<B>(session: &Session<B>, json: bool) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let sort = SortSettings::open(Arc::clone(&session.storage));
    let display = DisplaySettings::open(Arc::clone(&session.storage));
    let favorites = FavoritesStore::open(Arc::clone(&session.storage));

    let list_id = session.list_id();
    let tasks = sort.sorted(&session.todos.items());

    if json {
        let view = ListView {
            id: list_id.to_string(),
            title: session.list.title(),
            favorite: favorites.is_favorite(&list_id),
            tasks: tasks.iter().map(task_to_list_item).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let star = if favorites.is_favorite(&list_id) { " *" } else { "" };
    println!("{}{star}  ({list_id})", session.list.title());
    if let Some(error) = session.list.state().error {
        eprintln!("warning: {error}");
    }

    if tasks.is_empty() {
        println!("No tasks yet");
        return Ok(());
    }
    for line in format_task_lines(&tasks, display.wide_mode()) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_title<B>(session: &Session<B>, title_parts: &[String]) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let title = normalize_title(title_parts).unwrap_or_default();
    apply_title(session, &title).await?;
    println!("{}", session.list.title());
    Ok(())
}

/// Rename the list remotely and carry the new title into history and favorites
async fn apply_title<B>(session: &Session<B>, title: &str) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    session.list.update_title(title).await?;

    let list_id = session.list_id();
    let title = session.list.title();
    session.history.update_title(&list_id, &title);
    FavoritesStore::open(Arc::clone(&session.storage)).update_title(&list_id, &title);
    Ok(())
}
