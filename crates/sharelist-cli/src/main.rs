//! Sharelist CLI - shared todo lists from the terminal
//!
//! Every list command runs the same optimistic stores the web client uses,
//! against the Supabase project configured in the environment.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use std::io;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use sharelist_core::remote::{ListBackend, SupabaseClient, TodoBackend};
use sharelist_core::storage::SharedStorage;
use sharelist_core::stores::{HistoryStore, LastSeenTracker};
use sharelist_core::ClientConfig;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{open_storage, resolve_list_id, Session};
use crate::commands::completions::run_completions;
use crate::commands::export::run_export;
use crate::commands::history::{run_favorites, run_history};
use crate::commands::import::run_import;
use crate::commands::list::{run_new, run_show, run_title};
use crate::commands::settings::run_settings;
use crate::commands::tasks::{
    run_add, run_assign, run_clear_completed, run_delete, run_details, run_move, run_rename,
    run_status, run_toggle,
};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(directive("sharelist=info")?)
                .add_directive(directive("sharelist_core=info")?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = open_storage(cli.storage_dir)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::History { command } => run_history(command, &storage),
        Commands::Favorites { command } => {
            let history = HistoryStore::open(Arc::clone(&storage));
            let current = resolve_list_id(cli.list.as_deref(), &history).ok();
            run_favorites(command, current, &storage)
        }
        Commands::Settings { command } => run_settings(command, &storage),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        command => {
            let config = ClientConfig::from_env()?;
            let backend = SupabaseClient::from_config(&config)?;

            let tracker = LastSeenTracker::start(Arc::clone(&storage));
            let result = dispatch(
                command,
                cli.list.as_deref(),
                backend,
                config.auto_provision,
                storage,
            )
            .await;
            tracker.stop().await;
            result
        }
    }
}

fn directive(value: &str) -> Result<Directive, CliError> {
    value
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive '{value}': {error}")))
}

/// Run a command that needs the remote tables
async fn dispatch<B>(
    command: Commands,
    list: Option<&str>,
    backend: B,
    auto_provision: bool,
    storage: SharedStorage,
) -> Result<(), CliError>
where
    B: TodoBackend + ListBackend + Clone,
{
    if let Commands::New { title } = &command {
        run_new(backend, auto_provision, storage, title).await?;
        return Ok(());
    }

    let history = HistoryStore::open(Arc::clone(&storage));
    let list_id = resolve_list_id(list, &history)?;
    let session = Session::open(backend, auto_provision, storage, &list_id).await?;

    match command {
        Commands::Show { json } => run_show(&session, json)?,
        Commands::Add { title } => {
            run_add(&session, &title).await?;
        }
        Commands::Toggle { id } => run_toggle(&session, &id).await?,
        Commands::Status { id, status } => run_status(&session, &id, status).await?,
        Commands::Rename { id, title } => run_rename(&session, &id, &title).await?,
        Commands::Move { id, direction } => run_move(&session, &id, direction).await?,
        Commands::Assign { id, assignee } => run_assign(&session, &id, assignee).await?,
        Commands::Details {
            id,
            description,
            difficulty,
            clear_difficulty,
        } => run_details(&session, &id, description, difficulty, clear_difficulty).await?,
        Commands::Delete { id } => run_delete(&session, &id).await?,
        Commands::ClearCompleted => {
            run_clear_completed(&session).await?;
        }
        Commands::Title { title } => run_title(&session, &title).await?,
        Commands::Export { output } => {
            run_export(&session, output.as_deref())?;
        }
        Commands::Import { path } => {
            run_import(&session, &path).await?;
        }
        Commands::New { .. }
        | Commands::History { .. }
        | Commands::Favorites { .. }
        | Commands::Settings { .. }
        | Commands::Completions { .. } => {}
    }
    Ok(())
}
