//! Init command - first-run setup.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::AppConfig;
use crate::storage::AppStorage;
use console::style;

/// Run the init command: create the storage layout and report on
/// prerequisites.
pub fn run_init(storage: &AppStorage, config: &AppConfig) -> anyhow::Result<()> {
    Output::header("Prate Setup");
    println!();

    storage.init()?;
    Output::success(&format!("Storage root: {}", storage.root().display()));
    Output::kv("models", &storage.models_dir().display().to_string());
    Output::kv("projects", &storage.projects_dir().display().to_string());
    Output::kv("config", &storage.config_path().display().to_string());
    println!();

    println!("{}", style("Checking prerequisites").bold().cyan());
    for tool in ["yt-dlp", "ffmpeg"] {
        match preflight::check_tool(tool) {
            Ok(()) => println!("  {} {}", style("ok").green(), tool),
            Err(_) => {
                println!("  {} {} - not found", style("!!").red(), style(tool).bold());
                println!(
                    "     {}",
                    style("install it and make sure it's on your PATH").dim()
                );
            }
        }
    }

    match preflight::check_api_key() {
        Ok(()) => println!("  {} OPENAI_API_KEY", style("ok").green()),
        Err(_) => {
            println!("  {} OPENAI_API_KEY not set", style("!!").red());
            println!(
                "     {}",
                style("export OPENAI_API_KEY='sk-...' (needed for indexing and asking)").dim()
            );
        }
    }

    println!();
    Output::kv("default model", &config.user_config.model);
    Output::kv(
        "cpu threads",
        &config.user_config.cpu_threads.to_string(),
    );
    Output::success("Setup complete. Create a project with 'prate new <name>'.");
    Ok(())
}
