//! Add command - acquire audio into a project.

use crate::acquisition::is_remote_source;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::storage::AppStorage;

/// Run the add command.
pub async fn run_add(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
    source: &str,
) -> anyhow::Result<()> {
    if is_remote_source(source) {
        if let Err(e) = preflight::check(Operation::Acquire) {
            Output::error(&format!("{}", e));
            Output::info("Run 'prate doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let mut project = storage.open_project(project_name)?;
    let pipeline = Pipeline::new(config, storage);

    let spinner = Output::spinner("Acquiring audio...");
    match pipeline.acquire(&mut project, source).await {
        Ok(acquired) => {
            spinner.finish_and_clear();
            Output::success(&format!("Added '{}'", acquired.base_name));
            Output::kv("file", &acquired.path.display().to_string());
            Output::kv(
                "project files",
                &project.settings().number_files.to_string(),
            );
            Output::info("Run 'prate process' to transcribe and index.");
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}
