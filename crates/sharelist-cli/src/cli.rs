use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sharelist_core::models::{SortBy, SortDirection};
use sharelist_core::TaskStatus;

#[derive(Parser)]
#[command(name = "sharelist")]
#[command(about = "Shared todo lists from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// List to work on (defaults to the most recently opened list)
    #[arg(short, long, global = true, value_name = "ID")]
    pub list: Option<String>,

    /// Directory for locally mirrored history, favorites and settings
    #[arg(long, global = true, value_name = "PATH")]
    pub storage_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new list and make it the current one
    New {
        /// Optional list title
        title: Vec<String>,
    },
    /// Show the current list
    #[command(alias = "ls")]
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    Add {
        /// Task title
        title: Vec<String>,
    },
    /// Toggle a task between done and not started
    Toggle {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Set the status of a task
    Status {
        /// Task ID or unique ID prefix
        id: String,
        /// not_started, in_progress or done
        status: TaskStatus,
    },
    /// Rename a task
    Rename {
        /// Task ID or unique ID prefix
        id: String,
        /// New title
        title: Vec<String>,
    },
    /// Move an active task one step up or down
    Move {
        /// Task ID or unique ID prefix
        id: String,
        #[arg(value_enum)]
        direction: MoveArg,
    },
    /// Assign a task (omit the name to unassign)
    Assign {
        /// Task ID or unique ID prefix
        id: String,
        /// Assignee name
        assignee: Option<String>,
    },
    /// Update the description and difficulty of a task
    Details {
        /// Task ID or unique ID prefix
        id: String,
        /// Description text (empty clears it)
        #[arg(short, long)]
        description: Option<String>,
        /// Difficulty from 0 to 10 (half stars)
        #[arg(long)]
        difficulty: Option<u8>,
        /// Remove the difficulty rating
        #[arg(long, conflicts_with = "difficulty")]
        clear_difficulty: bool,
    },
    /// Delete a task
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Delete every completed task of the list
    ClearCompleted,
    /// Rename the current list
    Title {
        /// New list title (empty resets to the default)
        title: Vec<String>,
    },
    /// Export tasks as CSV
    Export {
        /// Optional output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import tasks from a CSV file
    Import {
        /// CSV file with at least a `title` column
        path: PathBuf,
    },
    /// Recently opened lists
    History {
        #[command(subcommand)]
        command: Option<HistoryCommands>,
    },
    /// Favorite lists
    Favorites {
        #[command(subcommand)]
        command: Option<FavoritesCommands>,
    },
    /// Display settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum MoveArg {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recently opened lists
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget one list
    Remove {
        /// List ID
        id: String,
    },
    /// Forget every list
    Clear,
}

#[derive(Subcommand)]
pub enum FavoritesCommands {
    /// List favorite lists
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a list to favorites (defaults to the current list)
    Add {
        /// List ID
        id: Option<String>,
    },
    /// Remove a list from favorites (defaults to the current list)
    Remove {
        /// List ID
        id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the current settings
    Show,
    /// Set the sort column and direction
    Sort {
        /// name, date, order or difficulty
        by: SortBy,
        /// asc or desc (unchanged when omitted)
        direction: Option<SortDirection>,
    },
    /// Toggle wide mode
    Wide,
}
