use std::sync::Arc;

use sharelist_core::storage::SharedStorage;
use sharelist_core::stores::{DisplaySettings, SortSettings};

use crate::cli::SettingsCommands;
use crate::error::CliError;

pub fn run_settings(command: Option<SettingsCommands>, storage: &SharedStorage) -> Result<(), CliError> {
    let sort = SortSettings::open(Arc::clone(storage));
    let display = DisplaySettings::open(Arc::clone(storage));

    match command.unwrap_or(SettingsCommands::Show) {
        SettingsCommands::Show => {}
        SettingsCommands::Sort { by, direction } => {
            sort.set_by(by);
            if let Some(direction) = direction {
                sort.set_direction(direction);
            }
        }
        SettingsCommands::Wide => {
            display.toggle();
        }
    }

    for line in settings_lines(&sort, &display) {
        println!("{line}");
    }
    Ok(())
}

pub fn settings_lines(sort: &SortSettings, display: &DisplaySettings) -> Vec<String> {
    vec![
        format!("sort by:    {}", sort.by()),
        format!("direction:  {}", sort.direction()),
        format!(
            "wide mode:  {}",
            if display.wide_mode() { "on" } else { "off" }
        ),
    ]
}
