//! New command - create a project.

use crate::cli::Output;
use crate::config::AppConfig;
use crate::error::PrateError;
use crate::storage::{sanitize_name, AppStorage};

/// Run the new command.
pub fn run_new(
    storage: &AppStorage,
    config: &AppConfig,
    name: &str,
    description: &str,
    model: Option<String>,
) -> anyhow::Result<()> {
    let model = model.unwrap_or_else(|| config.user_config.model.clone());
    if !config.is_model_available(&model) {
        Output::error(&format!(
            "Model '{}' is not available. Choose one of: {}",
            model,
            config.available_models().join(", ")
        ));
        return Err(PrateError::Config(format!("Unknown model '{}'", model)).into());
    }

    let sanitized = sanitize_name(name);
    if sanitized != name {
        Output::info(&format!("Using directory name '{}'", sanitized));
    }

    match storage.create_project(name, description, &model) {
        Ok(project) => {
            Output::success(&format!("Created project '{}'", project.name()));
            Output::kv("path", &project.path().display().to_string());
            Output::kv("model", &model);
            Output::info("Add audio with 'prate add <project> <url-or-file>'.");
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}
