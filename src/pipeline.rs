//! Ingestion pipeline for Prate.
//!
//! Coordinates the per-project run: acquire audio, transcribe every audio
//! file to a text file, then rebuild the project's vector index from all
//! transcripts. At most one run is active per project at a time, enforced
//! by a lock file in the project directory.

use crate::acquisition::{self, AcquiredAudio};
use crate::chunking::split_text;
use crate::config::AppConfig;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PrateError, Result};
use crate::storage::{AppStorage, Project};
use crate::transcription::{ModelCache, Transcriber, WhisperLocalTranscriber};
use crate::vector_store::{ChunkRecord, IndexBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The per-project ingestion pipeline.
pub struct Pipeline {
    config: AppConfig,
    models: ModelCache,
    embedder: Arc<dyn Embedder>,
}

impl Pipeline {
    /// Create a pipeline with the production embedder.
    pub fn new(config: AppConfig, storage: &AppStorage) -> Self {
        let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding));
        Self::with_embedder(config, ModelCache::new(storage.models_dir()), embedder)
    }

    /// Create a pipeline with a custom embedder.
    pub fn with_embedder(
        config: AppConfig,
        models: ModelCache,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            models,
            embedder,
        }
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Acquire audio from a URL or local path into the project, updating
    /// the project's file count and reprocessing flag.
    #[instrument(skip(self, project), fields(project = %project.name()))]
    pub async fn acquire(&self, project: &mut Project, input: &str) -> Result<AcquiredAudio> {
        let acquired = acquisition::acquire(input, &project.audios_dir()).await?;
        project.mark_assets_changed()?;
        info!("Acquired '{}'", acquired.base_name);
        Ok(acquired)
    }

    /// Transcribe every audio file in the project with the local model.
    pub async fn transcribe_all(&self, project: &Project) -> Result<TranscriptionSummary> {
        let _lock = PipelineLock::acquire(project)?;
        let transcriber = self.load_transcriber(&project.settings().model).await?;
        self.run_transcription(project, transcriber.as_ref()).await
    }

    /// Transcribe with a caller-provided backend.
    pub async fn transcribe_all_with(
        &self,
        project: &Project,
        transcriber: &dyn Transcriber,
    ) -> Result<TranscriptionSummary> {
        let _lock = PipelineLock::acquire(project)?;
        self.run_transcription(project, transcriber).await
    }

    /// Rebuild the project's vector index from all transcripts.
    pub async fn rebuild_index(&self, project: &mut Project) -> Result<usize> {
        let _lock = PipelineLock::acquire(project)?;
        self.run_indexing(project).await
    }

    /// Full ingestion run: transcribe everything, then rebuild the index.
    pub async fn process(&self, project: &mut Project) -> Result<ProcessSummary> {
        let _lock = PipelineLock::acquire(project)?;
        let transcriber = self.load_transcriber(&project.settings().model).await?;
        let transcription = self.run_transcription(project, transcriber.as_ref()).await?;
        let chunks_indexed = self.run_indexing(project).await?;
        Ok(ProcessSummary {
            transcription,
            chunks_indexed,
        })
    }

    /// Full run with a caller-provided transcription backend.
    pub async fn process_with(
        &self,
        project: &mut Project,
        transcriber: &dyn Transcriber,
    ) -> Result<ProcessSummary> {
        let _lock = PipelineLock::acquire(project)?;
        let transcription = self.run_transcription(project, transcriber).await?;
        let chunks_indexed = self.run_indexing(project).await?;
        Ok(ProcessSummary {
            transcription,
            chunks_indexed,
        })
    }

    /// Ensure the model weights are cached and load the local transcriber.
    async fn load_transcriber(&self, model: &str) -> Result<Box<dyn Transcriber>> {
        if !self.config.is_model_available(model) {
            return Err(PrateError::Config(format!(
                "Transcription model '{}' is not available",
                model
            )));
        }
        let model_path = self.models.ensure(model).await?;
        let transcriber = WhisperLocalTranscriber::load(
            &model_path,
            self.config.user_config.cpu_threads,
            &self.config.user_config.compute_type,
        )?;
        Ok(Box::new(transcriber))
    }

    /// Transcribe each audio file to `texts/<base>.txt`.
    ///
    /// A failure on one file is recorded in the summary and processing
    /// continues with the rest.
    #[instrument(skip_all, fields(project = %project.name()))]
    async fn run_transcription(
        &self,
        project: &Project,
        transcriber: &dyn Transcriber,
    ) -> Result<TranscriptionSummary> {
        let mut files = project.audio_files()?;
        files.sort();
        info!("Transcribing {} audio files", files.len());

        let separator = &self.config.user_config.segment_separator;
        let mut summary = TranscriptionSummary::default();

        for audio in files {
            let base_name = audio
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();

            match transcriber.transcribe(&audio).await {
                Ok(transcript) => {
                    if let Some(language) = &transcript.language {
                        info!(
                            "'{}': detected language '{}' (confidence {:.2})",
                            base_name,
                            language,
                            transcript.confidence.unwrap_or(0.0)
                        );
                    }
                    let text = transcript.joined_text(separator);
                    let target = project.texts_dir().join(format!("{}.txt", base_name));
                    std::fs::write(&target, text)?;
                    summary.succeeded.push(base_name);
                }
                Err(e) => {
                    warn!("Transcription of '{}' failed: {}", base_name, e);
                    summary.failed.push((base_name, e.to_string()));
                }
            }
        }

        info!(
            "Transcription finished: {} ok, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Chunk all transcripts, embed, and atomically replace the index.
    #[instrument(skip_all, fields(project = %project.name()))]
    async fn run_indexing(&self, project: &mut Project) -> Result<usize> {
        let mut files = project.transcript_files()?;
        files.sort();

        // Chunks from every transcript accumulate into one collection
        // before any embedding happens.
        let mut sources = Vec::new();
        let mut texts = Vec::new();
        for file in &files {
            let base_name = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let content = std::fs::read_to_string(file)?;
            for chunk in split_text(&content, &self.config.chunking) {
                sources.push(base_name.clone());
                texts.push(chunk);
            }
        }
        info!("Split {} transcripts into {} chunks", files.len(), texts.len());

        // An embedding failure propagates here, before the builder commits,
        // so the previous index stays in place.
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(PrateError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let records: Vec<ChunkRecord> = sources
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .enumerate()
            .map(|(order, ((source, content), embedding))| {
                ChunkRecord::new(source, content, order as i64, embedding)
            })
            .collect();

        let mut builder = IndexBuilder::create(&project.index_path())?;
        let count = builder.insert_batch(&records)?;
        builder.commit()?;

        project.clear_needs_processing()?;
        info!("Indexed {} chunks", count);
        Ok(count)
    }
}

/// Outcome of a transcription run.
#[derive(Debug, Default)]
pub struct TranscriptionSummary {
    /// Base names transcribed successfully.
    pub succeeded: Vec<String>,
    /// Base names that failed, with the failure reason.
    pub failed: Vec<(String, String)>,
}

impl TranscriptionSummary {
    /// True when no file failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a full ingestion run.
#[derive(Debug)]
pub struct ProcessSummary {
    pub transcription: TranscriptionSummary,
    pub chunks_indexed: usize,
}

/// Exclusive marker for an active pipeline run on one project.
///
/// Backed by a lock file created with `create_new`; dropping the guard
/// releases the lock. A second acquisition fails instead of waiting, since
/// two runs would race on the same folders and index file.
pub struct PipelineLock {
    path: PathBuf,
}

impl PipelineLock {
    const FILE_NAME: &'static str = ".pipeline.lock";

    /// Take the project's pipeline lock.
    pub fn acquire(project: &Project) -> Result<Self> {
        let path = project.path().join(Self::FILE_NAME);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(PrateError::PipelineBusy(project.name().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for PipelineLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::transcription::{Transcript, TranscriptSegment};
    use crate::vector_store::SqliteIndex;
    use async_trait::async_trait;
    use std::path::Path;

    /// Transcriber that produces fixed segments, failing for file names
    /// containing "broken".
    struct FakeTranscriber;

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
            let name = audio_path.file_name().unwrap().to_string_lossy();
            if name.contains("broken") {
                return Err(PrateError::Transcription("decoder blew up".to_string()));
            }
            Ok(Transcript::new(
                vec![
                    TranscriptSegment::new(0.0, 1.0, "hello "),
                    TranscriptSegment::new(1.0, 2.0, "world"),
                ],
                Some("en".to_string()),
                Some(0.9),
            ))
        }
    }

    /// Deterministic embedder: the embedding is a pure function of the text.
    struct FakeEmbedder;

    impl FakeEmbedder {
        fn vector(text: &str) -> Vec<f32> {
            let sum: u32 = text.bytes().map(u32::from).sum();
            vec![text.len() as f32, (sum % 997) as f32, 1.0]
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(Self::vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    /// Embedder that always fails, to exercise rebuild atomicity.
    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(PrateError::Embedding("quota exceeded".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PrateError::Embedding("quota exceeded".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn fixture(embedder: Arc<dyn Embedder>) -> (tempfile::TempDir, Pipeline, Project) {
        let dir = tempfile::tempdir().unwrap();
        let storage = AppStorage::new(dir.path());
        storage.init().unwrap();
        let project = storage.create_project("demo", "", "medium").unwrap();
        let pipeline = Pipeline::with_embedder(
            AppConfig::default(),
            ModelCache::new(storage.models_dir()),
            embedder,
        );
        (dir, pipeline, project)
    }

    #[tokio::test]
    async fn test_transcription_joins_segments_with_separator() {
        let (_dir, pipeline, project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.audios_dir().join("talk.mp3"), b"x").unwrap();

        let summary = pipeline
            .transcribe_all_with(&project, &FakeTranscriber)
            .await
            .unwrap();
        assert!(summary.is_clean());

        let text = std::fs::read_to_string(project.texts_dir().join("talk.txt")).unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_transcription_overwrites_prior_transcript() {
        let (_dir, pipeline, project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.audios_dir().join("talk.mp3"), b"x").unwrap();
        std::fs::write(project.texts_dir().join("talk.txt"), "stale words").unwrap();

        pipeline
            .transcribe_all_with(&project, &FakeTranscriber)
            .await
            .unwrap();

        let text = std::fs::read_to_string(project.texts_dir().join("talk.txt")).unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let (_dir, pipeline, project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.audios_dir().join("broken.mp3"), b"x").unwrap();
        std::fs::write(project.audios_dir().join("fine.mp3"), b"x").unwrap();

        let summary = pipeline
            .transcribe_all_with(&project, &FakeTranscriber)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, vec!["fine".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "broken");
        assert!(project.texts_dir().join("fine.txt").is_file());
        assert!(!project.texts_dir().join("broken.txt").exists());
    }

    #[tokio::test]
    async fn test_rebuild_aggregates_chunks_from_all_transcripts() {
        let (_dir, pipeline, mut project) = fixture(Arc::new(FakeEmbedder));
        let long = "a sentence that repeats itself over and over. ".repeat(13); // ~600 chars
        std::fs::write(project.texts_dir().join("first.txt"), &long).unwrap();
        std::fs::write(project.texts_dir().join("second.txt"), "b".repeat(300)).unwrap();

        let count = pipeline.rebuild_index(&mut project).await.unwrap();
        assert!(count >= 3, "600 + 300 chars must produce chunks from both files");

        let index = SqliteIndex::open(&project.index_path()).unwrap();
        assert_eq!(
            index.sources().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let (_dir, pipeline, mut project) = fixture(Arc::new(FakeEmbedder));
        let text = "the quick brown fox jumps over the lazy dog. ".repeat(30);
        std::fs::write(project.texts_dir().join("talk.txt"), &text).unwrap();

        let first_count = pipeline.rebuild_index(&mut project).await.unwrap();
        let index = SqliteIndex::open(&project.index_path()).unwrap();
        let query = FakeEmbedder::vector("quick brown fox");
        let first_hit = index.search(&query, 1, 0.0).unwrap()[0].chunk.content.clone();
        drop(index);

        let second_count = pipeline.rebuild_index(&mut project).await.unwrap();
        let index = SqliteIndex::open(&project.index_path()).unwrap();
        let second_hit = index.search(&query, 1, 0.0).unwrap()[0].chunk.content.clone();

        assert_eq!(first_count, second_count);
        assert_eq!(first_hit, second_hit);
    }

    #[tokio::test]
    async fn test_rebuild_clears_needs_processing() {
        let (_dir, pipeline, mut project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.audios_dir().join("a.mp3"), b"x").unwrap();
        project.mark_assets_changed().unwrap();
        assert!(project.settings().needs_processing);

        std::fs::write(project.texts_dir().join("a.txt"), "some words here").unwrap();
        pipeline.rebuild_index(&mut project).await.unwrap();
        assert!(!project.settings().needs_processing);
    }

    #[tokio::test]
    async fn test_failed_rebuild_leaves_previous_index() {
        let (_dir, pipeline, mut project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.texts_dir().join("talk.txt"), "original content").unwrap();
        pipeline.rebuild_index(&mut project).await.unwrap();

        let failing = Pipeline::with_embedder(
            AppConfig::default(),
            ModelCache::new(project.path().join("unused")),
            Arc::new(FailingEmbedder),
        );
        std::fs::write(project.texts_dir().join("talk.txt"), "changed content").unwrap();
        let err = failing.rebuild_index(&mut project).await.unwrap_err();
        assert!(matches!(err, PrateError::Embedding(_)));

        // the old index is still complete and readable
        let index = SqliteIndex::open(&project.index_path()).unwrap();
        let results = index
            .search(&FakeEmbedder::vector("original content"), 1, 0.0)
            .unwrap();
        assert_eq!(results[0].chunk.content, "original content");
    }

    #[tokio::test]
    async fn test_pipeline_lock_excludes_second_run() {
        let (_dir, pipeline, project) = fixture(Arc::new(FakeEmbedder));

        let lock = PipelineLock::acquire(&project).unwrap();
        let err = pipeline
            .transcribe_all_with(&project, &FakeTranscriber)
            .await
            .unwrap_err();
        assert!(matches!(err, PrateError::PipelineBusy(_)));

        drop(lock);
        assert!(pipeline
            .transcribe_all_with(&project, &FakeTranscriber)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_process_runs_both_stages() {
        let (_dir, pipeline, mut project) = fixture(Arc::new(FakeEmbedder));
        std::fs::write(project.audios_dir().join("talk.mp3"), b"x").unwrap();

        let summary = pipeline
            .process_with(&mut project, &FakeTranscriber)
            .await
            .unwrap();
        assert!(summary.transcription.is_clean());
        assert!(summary.chunks_indexed >= 1);
        assert!(project.index_path().is_file());
    }
}
