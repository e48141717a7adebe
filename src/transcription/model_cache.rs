//! Shared cache for transcription model weights.
//!
//! Weights are ggml files named `ggml-<model>.bin`, fetched once from the
//! upstream whisper.cpp repository and shared by every project. A lock
//! file guards the download so concurrent runs don't fetch duplicates,
//! and the file is written to a temporary name and renamed into place so
//! readers never see a partial model.

use crate::error::{PrateError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Cache of ggml model weights under the app's `models/` directory.
#[derive(Debug, Clone)]
pub struct ModelCache {
    dir: PathBuf,
}

impl ModelCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a model's weights live at once cached.
    pub fn model_path(&self, model: &str) -> PathBuf {
        self.dir.join(format!("ggml-{}.bin", model))
    }

    /// Whether a model's weights are already cached.
    pub fn is_cached(&self, model: &str) -> bool {
        self.model_path(model).is_file()
    }

    /// Return the weight path for a model, downloading it on first use.
    #[instrument(skip(self))]
    pub async fn ensure(&self, model: &str) -> Result<PathBuf> {
        let path = self.model_path(model);
        if path.is_file() {
            debug!("Model '{}' already cached", model);
            return Ok(path);
        }

        std::fs::create_dir_all(&self.dir)?;

        let _lock = DownloadLock::acquire(&self.dir.join(format!("{}.lock", model)))
            .ok_or_else(|| {
                PrateError::ModelCache(format!(
                    "Model '{}' is already being downloaded by another run; retry shortly",
                    model
                ))
            })?;

        // A concurrent run may have finished between the check and the lock.
        if path.is_file() {
            return Ok(path);
        }

        let url = format!("{}/ggml-{}.bin", MODEL_BASE_URL, model);
        info!("Downloading model '{}' from {}", model, url);

        let response = reqwest::get(url.as_str()).await?;
        if !response.status().is_success() {
            return Err(PrateError::ModelCache(format!(
                "Model download failed with HTTP {} for '{}'",
                response.status(),
                model
            )));
        }

        if let Some(len) = response.content_length() {
            debug!("Model size: {} MB", len / 1_000_000);
        }

        let partial = self.dir.join(format!("ggml-{}.bin.part", model));
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        std::fs::rename(&partial, &path)?;
        info!("Cached model '{}' at {}", model, path.display());
        Ok(path)
    }
}

/// Exclusive marker for an in-flight download; removed on drop.
struct DownloadLock {
    path: PathBuf,
}

impl DownloadLock {
    /// Try to take the lock. Returns None when it is already held.
    fn acquire(path: &Path) -> Option<Self> {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(_) => Some(Self {
                path: path.to_path_buf(),
            }),
            Err(_) => None,
        }
    }
}

impl Drop for DownloadLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_naming() {
        let cache = ModelCache::new("/tmp/models");
        assert_eq!(
            cache.model_path("large-v3"),
            PathBuf::from("/tmp/models/ggml-large-v3.bin")
        );
    }

    #[tokio::test]
    async fn test_ensure_returns_cached_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::new(dir.path());
        std::fs::write(cache.model_path("tiny"), b"weights").unwrap();

        let path = cache.ensure("tiny").await.unwrap();
        assert_eq!(path, cache.model_path("tiny"));
        assert!(cache.is_cached("tiny"));
    }

    #[test]
    fn test_download_lock_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("medium.lock");

        let first = DownloadLock::acquire(&lock_path);
        assert!(first.is_some());
        assert!(DownloadLock::acquire(&lock_path).is_none());

        drop(first);
        assert!(!lock_path.exists());
        assert!(DownloadLock::acquire(&lock_path).is_some());
    }
}
