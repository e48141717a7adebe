//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::AppConfig;
use crate::embedding::OpenAIEmbedder;
use crate::rag::RagEngine;
use crate::storage::AppStorage;
use crate::vector_store::SqliteIndex;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
pub async fn run_chat(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'prate doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let project = storage.open_project(project_name)?;
    let index = Arc::new(SqliteIndex::open(&project.index_path())?);
    let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding));

    let mut engine = RagEngine::new(index, embedder, &config.rag);

    println!(
        "\n{} {}",
        style("Prate Chat").bold().cyan(),
        style(format!("({})", project.name())).dim()
    );
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            engine.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        match engine.chat(input).await {
            Ok(response) => {
                println!("\n{} {}\n", style("Prate:").cyan().bold(), response.answer);
                if !response.sources.is_empty() {
                    let sources: Vec<String> = response
                        .sources
                        .iter()
                        .map(|s| format!("{} #{}", s.source, s.chunk_order))
                        .collect();
                    println!("{}\n", style(format!("sources: {}", sources.join(", "))).dim());
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
