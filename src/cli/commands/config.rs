//! Config command - show, set, and locate the configuration file.

use crate::cli::{ConfigAction, Output};
use crate::config::AppConfig;
use crate::storage::AppStorage;

/// Run the config command.
pub fn run_config(
    storage: &AppStorage,
    mut config: AppConfig,
    action: &ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = serde_json::to_string_pretty(&config)?;
            println!("{}", rendered);
        }

        ConfigAction::Set { key, value } => {
            config.set_value(key, value)?;
            config.save_to(&storage.config_path())?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Path => {
            println!("{}", storage.config_path().display());
        }
    }
    Ok(())
}
