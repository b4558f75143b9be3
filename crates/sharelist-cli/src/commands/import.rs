use std::path::Path;

use sharelist_core::csv::{import_tasks, parse_csv};
use sharelist_core::remote::{ListBackend, TodoBackend};

use crate::commands::common::Session;
use crate::error::CliError;

/// Insert every titled CSV row as a new task of the session's list
pub async fn run_import<B>(session: &Session<B>, path: &Path) -> Result<usize, CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let text = std::fs::read_to_string(path)?;
    let records = parse_csv(&text)?;

    let list_id = session.list_id();
    let tasks = import_tasks(&list_id, &records, &session.todos.items())?;

    for task in &tasks {
        session.todos.backend().insert_task(task).await?;
    }
    session.todos.load(&list_id).await?;

    println!("Imported {} task(s)", tasks.len());
    Ok(tasks.len())
}
