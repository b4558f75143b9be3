use std::path::{Path, PathBuf};

use sharelist_core::csv::{export_tasks_csv, suggested_export_file_name};
use sharelist_core::remote::{ListBackend, TodoBackend};
use sharelist_core::util::unix_millis_now;

use crate::commands::common::Session;
use crate::error::CliError;

pub fn run_export<B>(session: &Session<B>, output_path: Option<&Path>) -> Result<Option<PathBuf>, CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    let rendered = export_tasks_csv(&session.todos.ordered())?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(
                &session.list.title(),
                unix_millis_now(),
            ))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
        Ok(Some(path))
    } else {
        println!("{rendered}");
        Ok(None)
    }
}
