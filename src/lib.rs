//! Prate - project-based audio transcription and RAG
//!
//! A CLI tool for turning audio and video into searchable, chattable
//! projects. The name "Prate" comes from the Norwegian word for "chat."
//!
//! # Overview
//!
//! Prate lets you:
//! - Organize recordings into projects, each with its own folders and index
//! - Pull audio from online links (via yt-dlp) or local files
//! - Transcribe locally with Whisper models cached per installation
//! - Build a semantic search index over the transcripts
//! - Ask questions and chat with a project's content
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - app-wide configuration (`app_config.json`)
//! - `storage` - storage layout, project directories and settings
//! - `acquisition` - audio acquisition from URLs and local files
//! - `transcription` - local speech-to-text and the model weight cache
//! - `chunking` - transcript splitting for indexing
//! - `embedding` - embedding generation
//! - `vector_store` - per-project vector index
//! - `rag` - retrieval-augmented question answering
//! - `pipeline` - per-project ingestion runs
//!
//! # Example
//!
//! ```rust,no_run
//! use prate::config::AppConfig;
//! use prate::pipeline::Pipeline;
//! use prate::storage::AppStorage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = AppStorage::new(AppStorage::default_root());
//!     storage.init()?;
//!     let config = AppConfig::load_or_create(&storage.config_path())?;
//!
//!     let mut project = storage.open_project("lectures")?;
//!     let pipeline = Pipeline::new(config, &storage);
//!
//!     let summary = pipeline.process(&mut project).await?;
//!     println!("Indexed {} chunks", summary.chunks_indexed);
//!
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod rag;
pub mod storage;
pub mod transcription;
pub mod vector_store;

pub use error::{PrateError, Result};
