//! Error types for Prate.

use thiserror::Error;

/// Library-level error type for Prate operations.
#[derive(Error, Debug)]
pub enum PrateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Project '{0}' already exists")]
    ProjectExists(String),

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Invalid project name: {0}")]
    InvalidName(String),

    #[error("Audio acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Model cache error: {0}")]
    ModelCache(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("No vector index found at {0}. Run 'prate index' or 'prate process' first.")]
    IndexNotFound(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("Another pipeline run is already active for project '{0}'")]
    PipelineBusy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Why acquiring an audio asset failed.
///
/// Each cause is reported separately so callers can diagnose and retry
/// sensibly instead of seeing one opaque failure.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),
}

/// Result type alias for Prate operations.
pub type Result<T> = std::result::Result<T, PrateError>;
