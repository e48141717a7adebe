//! Remove command - delete an audio asset and its transcript.

use crate::cli::Output;
use crate::storage::AppStorage;

/// Run the remove command.
pub fn run_remove(storage: &AppStorage, project_name: &str, base_name: &str) -> anyhow::Result<()> {
    let mut project = storage.open_project(project_name)?;

    match project.remove_asset(base_name) {
        Ok(()) => {
            Output::success(&format!("Removed '{}' and its transcript", base_name));
            Output::info("The index still contains the old content until the next 'prate index'.");
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}
