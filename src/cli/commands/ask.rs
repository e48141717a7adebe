//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::AppConfig;
use crate::embedding::OpenAIEmbedder;
use crate::rag::RagEngine;
use crate::storage::AppStorage;
use crate::vector_store::SqliteIndex;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
    question: &str,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'prate doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let project = storage.open_project(project_name)?;
    let index = Arc::new(SqliteIndex::open(&project.index_path())?);
    let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding));

    let engine = RagEngine::new(index, embedder, &config.rag);

    let spinner = Output::spinner("Searching project...");
    match engine.ask(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.answer);

            if !response.sources.is_empty() {
                Output::header("Sources");
                for source in &response.sources {
                    Output::source_row(
                        &source.source,
                        source.chunk_order,
                        source.score,
                        &source.content,
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
