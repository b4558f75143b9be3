use std::collections::HashSet;

use sharelist_core::remote::{ListBackend, TodoBackend};
use sharelist_core::stores::MoveDirection;
use sharelist_core::{Task, TaskId, TaskStatus};

use crate::cli::MoveArg;
use crate::commands::common::{ensure_applied, normalize_title, resolve_task, short_id, Session};
use crate::error::CliError;

pub async fn run_add<B>(session: &Session<B>, title_parts: &[String]) -> Result<Task, CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let title = normalize_title(title_parts).ok_or(CliError::EmptyTitle)?;
    let before: HashSet<TaskId> = session.todos.items().into_iter().map(|task| task.id).collect();

    let outcome = session.todos.add(&session.list_id(), &title).await;
    ensure_applied(outcome, &session.todos)?;

    let task = session
        .todos
        .items()
        .into_iter()
        .find(|task| !before.contains(&task.id))
        .ok_or_else(|| CliError::TaskNotFound(title.clone()))?;
    println!("{}", task.id);
    Ok(task)
}

pub async fn run_toggle<B>(session: &Session<B>, id: &str) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let outcome = session.todos.toggle(&task.id).await;
    ensure_applied(outcome, &session.todos)?;
    print_status(session, &task.id);
    Ok(())
}

pub async fn run_status<B>(session: &Session<B>, id: &str, status: TaskStatus) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let outcome = session.todos.set_status(&task.id, status).await;
    ensure_applied(outcome, &session.todos)?;
    print_status(session, &task.id);
    Ok(())
}

pub async fn run_rename<B>(session: &Session<B>, id: &str, title_parts: &[String]) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let title = normalize_title(title_parts).ok_or(CliError::EmptyTitle)?;

    let outcome = session.todos.rename(&task.id, &title).await;
    if ensure_applied(outcome, &session.todos)? {
        println!("{}", task.id);
    } else {
        println!("No changes");
    }
    Ok(())
}

pub async fn run_move<B>(session: &Session<B>, id: &str, direction: MoveArg) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let direction = match direction {
        MoveArg::Up => MoveDirection::Up,
        MoveArg::Down => MoveDirection::Down,
    };

    let outcome = session.todos.move_task(&task.id, direction).await;
    if !ensure_applied(outcome, &session.todos)? {
        println!("Task {} cannot move further", short_id(&task));
        return Ok(());
    }

    let position = session
        .todos
        .ordered()
        .iter()
        .position(|candidate| candidate.id == task.id)
        .map_or(0, |index| index + 1);
    println!("{}  position {position}", task.id);
    Ok(())
}

pub async fn run_assign<B>(session: &Session<B>, id: &str, assignee: Option<String>) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let outcome = session.todos.reassign(&task.id, assignee).await;
    ensure_applied(outcome, &session.todos)?;

    match session.todos.find(&task.id).and_then(|task| task.assignee) {
        Some(assignee) => println!("{}  @{assignee}", task.id),
        None => println!("{}  unassigned", task.id),
    }
    Ok(())
}

pub async fn run_details<B>(
    session: &Session<B>,
    id: &str,
    description: Option<String>,
    difficulty: Option<u8>,
    clear_difficulty: bool,
) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    // Omitted flags keep the current values; an empty description clears it.
    let description = description.or_else(|| task.description.clone());
    let difficulty = if clear_difficulty {
        None
    } else {
        difficulty.or(task.difficulty)
    };

    let outcome = session
        .todos
        .update_details(&task.id, description, difficulty)
        .await;
    if ensure_applied(outcome, &session.todos)? {
        println!("{}", task.id);
    } else {
        println!("No changes");
    }
    Ok(())
}

pub async fn run_delete<B>(session: &Session<B>, id: &str) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let task = resolve_task(id, &session.todos.items())?;
    let outcome = session.todos.delete(&task.id).await;
    ensure_applied(outcome, &session.todos)?;
    println!("{}", task.id);
    Ok(())
}

pub async fn run_clear_completed<B>(session: &Session<B>) -> Result<usize, CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let completed = session
        .todos
        .items()
        .iter()
        .filter(|task| task.is_completed())
        .count();

    let outcome = session.todos.clear_completed(&session.list_id()).await;
    ensure_applied(outcome, &session.todos)?;
    println!("Removed {completed} completed task(s)");
    Ok(completed)
}

fn print_status<B: TodoBackend>(session: &Session<B>, id: &TaskId) {
    if let Some(task) = session.todos.find(id) {
        println!("{}  {}", task.id, task.status);
    }
}
