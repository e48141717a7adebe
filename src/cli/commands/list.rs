//! List command - show all projects.

use crate::cli::Output;
use crate::storage::AppStorage;

/// Run the list command.
pub fn run_list(storage: &AppStorage) -> anyhow::Result<()> {
    let mut names = storage.list_projects()?;
    names.sort();

    if names.is_empty() {
        Output::info("No projects yet. Create one with 'prate new <name>'.");
        return Ok(());
    }

    Output::header("Projects");
    for name in names {
        match storage.open_project(&name) {
            Ok(project) => {
                let settings = project.settings();
                Output::project_row(
                    &name,
                    settings.number_files,
                    &settings.created_at,
                    settings.needs_processing,
                );
            }
            Err(_) => {
                // directory without a readable settings file
                Output::project_row(&name, 0, "unknown", false);
            }
        }
    }
    Ok(())
}
