//! Configuration module for Prate.
//!
//! Handles the per-installation `app_config.json` document.

mod app;

pub use app::{
    AppConfig, ChunkingConfig, EmbeddingConfig, RagConfig, UserConfig, DEFAULT_MODEL,
    FALLBACK_CPU_THREADS,
};
