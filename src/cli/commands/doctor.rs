//! Doctor command - diagnostics for tools, keys, and storage.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::AppConfig;
use crate::storage::AppStorage;
use console::style;

/// Run the doctor command.
pub fn run_doctor(storage: &AppStorage, config: &AppConfig) -> anyhow::Result<()> {
    Output::header("Prate Doctor");

    println!("\n{}", style("External tools").bold());
    for tool in ["yt-dlp", "ffmpeg"] {
        match preflight::check_tool(tool) {
            Ok(()) => println!("  {} {}", style("ok").green(), tool),
            Err(e) => println!("  {} {} ({})", style("!!").red(), tool, e),
        }
    }

    println!("\n{}", style("API access").bold());
    match preflight::check_api_key() {
        Ok(()) => println!("  {} OPENAI_API_KEY", style("ok").green()),
        Err(e) => println!("  {} {}", style("!!").red(), e),
    }

    println!("\n{}", style("Storage").bold());
    for (label, path) in [
        ("root", storage.root().to_path_buf()),
        ("models", storage.models_dir()),
        ("projects", storage.projects_dir()),
    ] {
        let status = if path.is_dir() {
            style("ok").green()
        } else {
            style("missing (run 'prate init')").yellow()
        };
        println!("  {} {}: {}", status, label, path.display());
    }

    println!("\n{}", style("Configuration").bold());
    match config.validate() {
        Ok(()) => {
            println!("  {} {}", style("ok").green(), storage.config_path().display());
            Output::kv("model", &config.user_config.model);
            Output::kv("compute type", &config.user_config.compute_type);
            Output::kv("cpu threads", &config.user_config.cpu_threads.to_string());
            Output::kv(
                "chunking",
                &format!(
                    "{} chars, {} overlap",
                    config.chunking.chunk_size, config.chunking.chunk_overlap
                ),
            );
            Output::kv(
                "retrieval",
                &format!("top {} (min score {})", config.rag.top_k, config.rag.min_score),
            );
        }
        Err(e) => println!("  {} {}", style("!!").red(), e),
    }

    let projects = storage.list_projects()?;
    println!("\n{}", style("Projects").bold());
    println!("  {} project(s)", projects.len());

    Ok(())
}
