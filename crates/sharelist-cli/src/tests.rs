use std::sync::Arc;

use chrono::Utc;
use pretty_assertions::assert_eq;
use sharelist_core::models::{SortBy, SortDirection};
use sharelist_core::remote::MemoryBackend;
use sharelist_core::storage::{MemoryStorage, SharedStorage};
use sharelist_core::stores::{FavoritesStore, HistoryStore, SortSettings};
use sharelist_core::{ListId, NewTask, Task, TaskId, TaskStatus};

use crate::cli::{Commands, CompletionShell, FavoritesCommands, MoveArg, SettingsCommands};
use crate::commands::common::{
    difficulty_label, format_relative_time, format_task_lines, normalize_task_identifier,
    normalize_title, resolve_list_id, resolve_task, task_preview, Session,
};
use crate::commands::completions::render_completions;
use crate::commands::export::run_export;
use crate::commands::history::{format_entry_lines, run_favorites};
use crate::commands::import::run_import;
use crate::commands::list::run_title;
use crate::commands::settings::run_settings;
use crate::commands::tasks::{
    run_add, run_clear_completed, run_delete, run_details, run_move, run_rename, run_status,
    run_toggle,
};
use crate::error::CliError;
use crate::dispatch;

fn list() -> ListId {
    ListId::from("groceries")
}

fn task_with_id(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::from(id),
        list_id: list(),
        title: title.to_string(),
        status: TaskStatus::NotStarted,
        difficulty: None,
        description: None,
        assignee: None,
        order: 0,
        created_at: Utc::now(),
    }
}

fn seed(backend: &MemoryBackend, title: &str, order: i64) -> Task {
    let mut task = NewTask::new(list(), title);
    task.order = order;
    backend.seed_task(&task)
}

async fn open_session(backend: &MemoryBackend, storage: &SharedStorage) -> Session<MemoryBackend> {
    Session::open(backend.clone(), false, Arc::clone(storage), &list())
        .await
        .unwrap()
}

fn titles(session: &Session<MemoryBackend>) -> Vec<String> {
    session
        .todos
        .ordered()
        .into_iter()
        .map(|task| task.title)
        .collect()
}

#[test]
fn normalize_title_joins_and_trims() {
    let parts = vec!["  Buy".to_string(), "milk  ".to_string()];
    assert_eq!(normalize_title(&parts), Some("Buy milk".to_string()));
    assert_eq!(normalize_title(&[" ".to_string()]), None);
    assert_eq!(normalize_title(&[]), None);
}

#[test]
fn normalize_task_identifier_rejects_empty() {
    assert!(matches!(
        normalize_task_identifier(" \n "),
        Err(CliError::EmptyTaskId)
    ));
    assert_eq!(normalize_task_identifier("  abc123  ").unwrap(), "abc123");
}

#[test]
fn resolve_task_supports_exact_and_prefix_id() {
    let tasks = vec![
        task_with_id("11111111-1111-4111-8111-111111111111", "Milk"),
        task_with_id("11111111-1111-4111-8111-222222222222", "Eggs"),
        task_with_id("33333333-1111-4111-8111-111111111111", "Bread"),
    ];

    let exact = resolve_task("11111111-1111-4111-8111-222222222222", &tasks).unwrap();
    assert_eq!(exact.title, "Eggs");

    let by_prefix = resolve_task("3333", &tasks).unwrap();
    assert_eq!(by_prefix.title, "Bread");

    let ambiguous = resolve_task("1111", &tasks).unwrap_err();
    assert!(matches!(ambiguous, CliError::AmbiguousTaskId(_)));
    assert!(ambiguous
        .to_string()
        .contains("ID prefix '1111' is ambiguous; matches: 11111111-1111, 11111111-1111"));

    assert!(matches!(
        resolve_task("ffff", &tasks),
        Err(CliError::TaskNotFound(query)) if query == "ffff"
    ));
}

#[test]
fn task_preview_truncates_with_ellipsis() {
    let preview = task_preview("This is a very long sentence that should be shortened", 20);
    assert_eq!(preview, "This is a very lo...");
    assert_eq!(task_preview("  spaced   out  ", 20), "spaced out");
}

#[test]
fn difficulty_label_uses_half_stars() {
    assert_eq!(difficulty_label(None), "");
    assert_eq!(difficulty_label(Some(0)), "");
    assert_eq!(difficulty_label(Some(4)), "2*");
    assert_eq!(difficulty_label(Some(7)), "3.5*");
    assert_eq!(difficulty_label(Some(42)), "5*");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_task_lines_show_status_and_assignee() {
    let mut done = task_with_id("22222222-0000-4000-8000-000000000000", "Eggs");
    done.status = TaskStatus::Done;
    done.assignee = Some("sam".to_string());
    let open = task_with_id("11111111-0000-4000-8000-000000000000", "Milk");

    let lines = format_task_lines(&[open, done], false);
    assert!(lines[0].starts_with("11111111-0000  [ ] Milk"));
    assert!(lines[1].starts_with("22222222-0000  [x] Eggs"));
    assert!(lines[1].ends_with("@sam"));
}

#[test]
fn format_entry_lines_pad_ids() {
    let entries = vec![sharelist_core::ListEntry::new("weekend", "Weekend chores")];
    let lines = format_entry_lines(&entries);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("weekend "));
    assert!(lines[0].ends_with("Weekend chores"));
}

#[test]
fn resolve_list_id_prefers_flag_then_history() {
    let storage = MemoryStorage::shared();
    let history = HistoryStore::open(Arc::clone(&storage));

    assert!(matches!(
        resolve_list_id(None, &history),
        Err(CliError::NoListSelected)
    ));

    history.add(&ListId::from("older"), "Older");
    history.add(&ListId::from("recent"), "Recent");
    assert_eq!(resolve_list_id(None, &history).unwrap(), ListId::from("recent"));
    assert_eq!(
        resolve_list_id(Some(" pinned "), &history).unwrap(),
        ListId::from("pinned")
    );
}

#[test]
fn completions_name_the_sharelist_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("sharelist"));
}

#[tokio::test]
async fn session_open_loads_tasks_and_records_history() {
    let backend = MemoryBackend::new();
    backend.seed_list(&list(), "Groceries");
    seed(&backend, "Milk", 0);
    let storage = MemoryStorage::shared();

    let session = open_session(&backend, &storage).await;
    assert_eq!(titles(&session), vec!["Milk"]);
    assert_eq!(session.list.title(), "Groceries");

    let history = HistoryStore::open(Arc::clone(&storage)).entries();
    assert_eq!(history[0].id, list());
    assert_eq!(history[0].title, "Groceries");
}

#[tokio::test]
async fn session_open_fails_when_tasks_cannot_load() {
    let backend = MemoryBackend::new();
    backend.set_fail_reads(true);
    let storage = MemoryStorage::shared();

    let result = Session::open(backend, false, storage, &list()).await;
    assert!(matches!(result, Err(CliError::Core(_))));
}

#[tokio::test]
async fn run_add_returns_confirmed_task() {
    let backend = MemoryBackend::new();
    seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    let task = run_add(&session, &["Buy".to_string(), "eggs".to_string()])
        .await
        .unwrap();
    assert!(!task.id.is_temporary());
    assert_eq!(task.title, "Buy eggs");
    assert_eq!(task.order, 1);
    assert_eq!(backend.tasks(&list()).len(), 2);
}

#[tokio::test]
async fn run_add_rejects_blank_title() {
    let backend = MemoryBackend::new();
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    let result = run_add(&session, &["   ".to_string()]).await;
    assert!(matches!(result, Err(CliError::EmptyTitle)));
    assert!(!backend.calls().contains(&"insert_task"));
}

#[tokio::test]
async fn run_toggle_and_status_update_remote_rows() {
    let backend = MemoryBackend::new();
    let milk = seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    run_toggle(&session, &milk.id.as_str()[..8]).await.unwrap();
    assert_eq!(backend.tasks(&list())[0].status, TaskStatus::Done);

    run_status(&session, milk.id.as_str(), TaskStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(backend.tasks(&list())[0].status, TaskStatus::InProgress);
}

#[tokio::test]
async fn run_rename_surfaces_store_error_on_failure() {
    let backend = MemoryBackend::new();
    let milk = seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    backend.fail_next_writes(1);
    let error = run_rename(&session, milk.id.as_str(), &["Oat milk".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(error, CliError::MutationFailed(_)));
    assert_eq!(error.to_string(), "Failed to update todo title");
    assert_eq!(titles(&session), vec!["Milk"]);
    assert_eq!(backend.tasks(&list())[0].title, "Milk");
}

#[tokio::test]
async fn run_details_keeps_omitted_fields_and_clears_on_request() {
    let backend = MemoryBackend::new();
    let milk = seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    run_details(&session, milk.id.as_str(), Some("two litres".to_string()), Some(4), false)
        .await
        .unwrap();
    run_details(&session, milk.id.as_str(), None, Some(6), false)
        .await
        .unwrap();
    let remote = &backend.tasks(&list())[0];
    assert_eq!(remote.description.as_deref(), Some("two litres"));
    assert_eq!(remote.difficulty, Some(6));

    run_details(&session, milk.id.as_str(), Some(String::new()), None, true)
        .await
        .unwrap();
    let remote = &backend.tasks(&list())[0];
    assert_eq!(remote.description, None);
    assert_eq!(remote.difficulty, None);
}

#[tokio::test]
async fn run_move_swaps_with_neighbour() {
    let backend = MemoryBackend::new();
    seed(&backend, "A", 0);
    seed(&backend, "B", 1);
    let c = seed(&backend, "C", 2);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    run_move(&session, c.id.as_str(), MoveArg::Up).await.unwrap();
    assert_eq!(titles(&session), vec!["A", "C", "B"]);

    let remote: Vec<String> = backend
        .tasks(&list())
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(remote, vec!["A", "C", "B"]);
}

#[tokio::test]
async fn run_delete_and_clear_completed_remove_rows() {
    let backend = MemoryBackend::new();
    let milk = seed(&backend, "Milk", 0);
    let mut done = NewTask::new(list(), "Eggs");
    done.status = TaskStatus::Done;
    backend.seed_task(&done);
    seed(&backend, "Bread", 1);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    run_delete(&session, milk.id.as_str()).await.unwrap();
    assert_eq!(titles(&session), vec!["Bread", "Eggs"]);

    let removed = run_clear_completed(&session).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(titles(&session), vec!["Bread"]);
    assert_eq!(backend.tasks(&list()).len(), 1);
}

#[tokio::test]
async fn run_title_updates_history_and_favorites() {
    let backend = MemoryBackend::new();
    let storage = MemoryStorage::shared();
    let session = open_session(&backend, &storage).await;
    FavoritesStore::open(Arc::clone(&storage)).add(&list(), "Untitled List");

    run_title(&session, &["Weekly".to_string(), "shop".to_string()])
        .await
        .unwrap();

    assert_eq!(backend.list_title(&list()).as_deref(), Some("Weekly shop"));
    assert_eq!(
        HistoryStore::open(Arc::clone(&storage)).entries()[0].title,
        "Weekly shop"
    );
    assert_eq!(
        FavoritesStore::open(Arc::clone(&storage)).entries()[0].title,
        "Weekly shop"
    );
}

#[tokio::test]
async fn run_export_writes_suggested_file_into_directory() {
    let backend = MemoryBackend::new();
    seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;
    let dir = tempfile::tempdir().unwrap();

    let path = run_export(&session, Some(dir.path())).unwrap().unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("sharelist-untitled-list-"));
    assert!(file_name.ends_with(".csv"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("id,title,status"));
    assert!(content.contains("Milk"));
}

#[tokio::test]
async fn run_import_appends_rows_after_existing_tasks() {
    let backend = MemoryBackend::new();
    seed(&backend, "Milk", 0);
    let session = open_session(&backend, &MemoryStorage::shared()).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.csv");
    std::fs::write(&path, "title,status\nEggs,\n,done\nBread,done\n").unwrap();

    let imported = run_import(&session, &path).await.unwrap();
    assert_eq!(imported, 2);
    assert_eq!(titles(&session), vec!["Milk", "Eggs", "Bread"]);

    let eggs = session
        .todos
        .items()
        .into_iter()
        .find(|task| task.title == "Eggs")
        .unwrap();
    assert_eq!(eggs.order, 1);
}

#[tokio::test]
async fn dispatch_new_creates_titled_list() {
    let backend = MemoryBackend::new();
    let storage = MemoryStorage::shared();

    dispatch(
        Commands::New {
            title: vec!["Weekend".to_string()],
        },
        None,
        backend.clone(),
        false,
        Arc::clone(&storage),
    )
    .await
    .unwrap();

    let history = HistoryStore::open(Arc::clone(&storage)).entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "Weekend");
    assert_eq!(backend.list_title(&history[0].id).as_deref(), Some("Weekend"));
}

#[tokio::test]
async fn dispatch_without_list_requires_selection() {
    let result = dispatch(
        Commands::Show { json: false },
        None,
        MemoryBackend::new(),
        false,
        MemoryStorage::shared(),
    )
    .await;
    assert!(matches!(result, Err(CliError::NoListSelected)));
}

#[test]
fn favorites_add_uses_title_from_history() {
    let storage = MemoryStorage::shared();
    HistoryStore::open(Arc::clone(&storage)).add(&list(), "Groceries");

    run_favorites(
        Some(FavoritesCommands::Add { id: None }),
        Some(list()),
        &storage,
    )
    .unwrap();

    let favorites = FavoritesStore::open(Arc::clone(&storage));
    assert!(favorites.is_favorite(&list()));
    assert_eq!(favorites.entries()[0].title, "Groceries");

    run_favorites(
        Some(FavoritesCommands::Remove {
            id: Some("groceries".to_string()),
        }),
        None,
        &storage,
    )
    .unwrap();
    assert!(FavoritesStore::open(storage).entries().is_empty());
}

#[test]
fn favorites_without_target_list_fail() {
    let result = run_favorites(
        Some(FavoritesCommands::Add { id: None }),
        None,
        &MemoryStorage::shared(),
    );
    assert!(matches!(result, Err(CliError::NoListSelected)));
}

#[test]
fn settings_sort_is_persisted() {
    let storage = MemoryStorage::shared();

    run_settings(
        Some(SettingsCommands::Sort {
            by: SortBy::Name,
            direction: Some(SortDirection::Desc),
        }),
        &storage,
    )
    .unwrap();

    let sort = SortSettings::open(storage);
    assert_eq!(sort.by(), SortBy::Name);
    assert_eq!(sort.direction(), SortDirection::Desc);
}
