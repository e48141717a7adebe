//! Delete command - remove a project recursively, with confirmation.

use crate::cli::Output;
use crate::storage::AppStorage;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the delete command.
pub fn run_delete(storage: &AppStorage, name: &str, yes: bool) -> anyhow::Result<()> {
    let project = storage.open_project(name)?;
    let file_count = project.settings().number_files;

    if !yes {
        print!(
            "{} Delete project '{}' and its {} audio files? [y/N] ",
            style("??").yellow().bold(),
            name,
            file_count
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            Output::info("Cancelled.");
            return Ok(());
        }
    }

    storage.delete_project(name)?;
    Output::success(&format!("Deleted project '{}'", name));
    Ok(())
}
