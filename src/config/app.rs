//! Per-installation application configuration.
//!
//! A single JSON document at `<app root>/app_config.json`, loaded once at
//! startup and passed read-only into every component that needs it. If the
//! file is absent it is synthesized with defaults and persisted immediately.

use crate::error::{PrateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Model size used when no explicit choice has been made.
pub const DEFAULT_MODEL: &str = "medium";

/// Thread count used when auto-detection fails.
pub const FALLBACK_CPU_THREADS: usize = 4;

/// The fixed set of compute precision modes a user may select.
const COMPUTE_TYPES: &[&str] = &[
    "default",
    "int8",
    "int8_float32",
    "int8_float16",
    "int8_bfloat16",
    "int16",
    "float16",
    "bfloat16",
    "float32",
];

/// Known transcription model identifiers and whether they are offered by
/// default. The `.en` variants exist but are not advertised.
const MODEL_AVAILABILITY: &[(&str, bool)] = &[
    ("tiny", true),
    ("tiny.en", false),
    ("base", true),
    ("base.en", false),
    ("small", true),
    ("small.en", false),
    ("medium", true),
    ("medium.en", false),
    ("large-v1", true),
    ("large-v2", true),
    ("large-v3", true),
    ("large", true),
];

/// Root configuration structure, mirroring `app_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub user_config: UserConfig,
    pub compute_types: Vec<String>,
    pub models: BTreeMap<String, bool>,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub rag: RagConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_config: UserConfig::default(),
            compute_types: COMPUTE_TYPES.iter().map(|s| s.to_string()).collect(),
            models: MODEL_AVAILABILITY
                .iter()
                .map(|(id, available)| (id.to_string(), *available))
                .collect(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            rag: RagConfig::default(),
        }
    }
}

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Compute precision mode, one of `compute_types`.
    pub compute_type: String,
    /// Default transcription model for new projects.
    pub model: String,
    /// Threads used by local transcription.
    pub cpu_threads: usize,
    /// Separator inserted between transcript segments when writing text files.
    pub segment_separator: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            compute_type: "default".to_string(),
            model: DEFAULT_MODEL.to_string(),
            cpu_threads: detect_cpu_threads(),
            segment_separator: " ".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Overlap carried between neighboring chunks, in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 32,
        }
    }
}

/// Retrieval and answer-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chat model for answer generation.
    pub model: String,
    /// Number of nearest chunks retrieved per question.
    pub top_k: usize,
    /// Minimum similarity score for a chunk to be used as context.
    pub min_score: f32,
    /// Generation temperature.
    pub temperature: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            top_k: 10,
            min_score: 0.3,
            temperature: 0.7,
        }
    }
}

/// Detect the CPU thread count, falling back when detection fails.
fn detect_cpu_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_CPU_THREADS)
}

impl AppConfig {
    /// Load the configuration file, creating it with defaults on first run.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Persist the configuration as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check internal consistency of user-selected values.
    pub fn validate(&self) -> Result<()> {
        if !self.models.contains_key(&self.user_config.model) {
            return Err(PrateError::Config(format!(
                "Unknown transcription model '{}'",
                self.user_config.model
            )));
        }
        if !self
            .compute_types
            .iter()
            .any(|t| t == &self.user_config.compute_type)
        {
            return Err(PrateError::Config(format!(
                "Unknown compute type '{}'",
                self.user_config.compute_type
            )));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(PrateError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        Ok(())
    }

    /// Model identifiers currently offered to the user.
    pub fn available_models(&self) -> Vec<&str> {
        self.models
            .iter()
            .filter(|(_, available)| **available)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Check that a model identifier is known and offered.
    pub fn is_model_available(&self, model: &str) -> bool {
        self.models.get(model).copied().unwrap_or(false)
    }

    /// Update a single setting addressed by a dotted key, e.g. `rag.top_k`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "user_config.compute_type" => self.user_config.compute_type = value.to_string(),
            "user_config.model" => self.user_config.model = value.to_string(),
            "user_config.cpu_threads" => {
                self.user_config.cpu_threads = parse_setting(key, value)?;
            }
            "user_config.segment_separator" => {
                self.user_config.segment_separator = value.to_string();
            }
            "embedding.model" => self.embedding.model = value.to_string(),
            "embedding.dimensions" => self.embedding.dimensions = parse_setting(key, value)?,
            "chunking.chunk_size" => self.chunking.chunk_size = parse_setting(key, value)?,
            "chunking.chunk_overlap" => self.chunking.chunk_overlap = parse_setting(key, value)?,
            "rag.model" => self.rag.model = value.to_string(),
            "rag.top_k" => self.rag.top_k = parse_setting(key, value)?,
            "rag.min_score" => self.rag.min_score = parse_setting(key, value)?,
            "rag.temperature" => self.rag.temperature = parse_setting(key, value)?,
            _ => {
                return Err(PrateError::Config(format!("Unknown setting '{}'", key)));
            }
        }
        self.validate()
    }
}

fn parse_setting<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| PrateError::Config(format!("Invalid value '{}' for '{}'", value, key)))
}
