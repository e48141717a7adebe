//! Transcribe, index, and process commands - the ingestion stages.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::AppConfig;
use crate::pipeline::{Pipeline, TranscriptionSummary};
use crate::storage::AppStorage;

/// Run the transcribe command.
pub async fn run_transcribe(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe) {
        Output::error(&format!("{}", e));
        Output::info("Run 'prate doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let project = storage.open_project(project_name)?;
    let pipeline = Pipeline::new(config, storage);

    let spinner = Output::spinner("Transcribing audio files...");
    let summary = pipeline.transcribe_all(&project).await;
    spinner.finish_and_clear();

    match summary {
        Ok(summary) => {
            print_transcription_summary(&summary);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}

/// Run the index command.
pub async fn run_index(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Index) {
        Output::error(&format!("{}", e));
        Output::info("Run 'prate doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let mut project = storage.open_project(project_name)?;
    let pipeline = Pipeline::new(config, storage);

    let spinner = Output::spinner("Rebuilding search index...");
    let result = pipeline.rebuild_index(&mut project).await;
    spinner.finish_and_clear();

    match result {
        Ok(count) => {
            Output::success(&format!("Indexed {} chunks", count));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}

/// Run the process command: transcription followed by indexing.
pub async fn run_process(
    storage: &AppStorage,
    config: AppConfig,
    project_name: &str,
) -> anyhow::Result<()> {
    for operation in [Operation::Transcribe, Operation::Index] {
        if let Err(e) = preflight::check(operation) {
            Output::error(&format!("{}", e));
            Output::info("Run 'prate doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }

    let mut project = storage.open_project(project_name)?;
    let pipeline = Pipeline::new(config, storage);

    let spinner = Output::spinner("Processing project...");
    let result = pipeline.process(&mut project).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            print_transcription_summary(&summary.transcription);
            Output::success(&format!("Indexed {} chunks", summary.chunks_indexed));
            Output::info("Ask questions with 'prate ask'.");
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}

/// Print the per-file outcome of a transcription run.
fn print_transcription_summary(summary: &TranscriptionSummary) {
    Output::success(&format!(
        "Transcribed {} file(s)",
        summary.succeeded.len()
    ));
    if !summary.failed.is_empty() {
        Output::warning(&format!("{} file(s) failed:", summary.failed.len()));
        for (name, reason) in &summary.failed {
            Output::kv(name, reason);
        }
    }
}
