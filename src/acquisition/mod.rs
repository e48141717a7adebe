//! Audio acquisition for Prate.
//!
//! Resolves a source (remote URL or local file path) to an audio file in a
//! project's `audios/` folder. Remote sources go through yt-dlp; local
//! files are validated against the allowed extension set and copied in.

mod download;

pub use download::acquire_url;

use crate::error::{AcquisitionError, PrateError, Result};
use crate::storage::sanitize_name;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Extensions the transcription stage will pick up. Anything else in
/// `audios/` is ignored.
pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] =
    &["m4a", "mp3", "wav", "flac", "mp4", "wma", "aac", "ogg"];

/// Check a path against the allowed extension set, case-insensitively.
pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Where an audio asset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrigin {
    Remote,
    Local,
}

/// A successfully acquired audio asset.
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    /// Full path of the stored file under `audios/`.
    pub path: PathBuf,
    /// File name without extension; pairs the asset with its transcript.
    pub base_name: String,
    pub origin: SourceOrigin,
}

impl AcquiredAudio {
    pub(crate) fn from_stored(path: PathBuf, origin: SourceOrigin) -> Self {
        let base_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            path,
            base_name,
            origin,
        }
    }
}

/// True iff the input should be treated as a remote URL rather than a
/// local path.
pub fn is_remote_source(input: &str) -> bool {
    matches!(
        url::Url::parse(input).map(|u| u.scheme().to_string()),
        Ok(scheme) if scheme == "http" || scheme == "https"
    )
}

/// Acquire audio from either a URL or a local file, based on the input.
pub async fn acquire(input: &str, audios_dir: &Path) -> Result<AcquiredAudio> {
    if is_remote_source(input) {
        acquire_url(input, audios_dir).await
    } else {
        acquire_local(Path::new(input), audios_dir)
    }
}

/// Copy a local media file into the project's audio folder.
///
/// The file must exist and carry an extension from the allowed set. The
/// stored name is the sanitized stem plus the original extension; an
/// already-present copy is reused.
pub fn acquire_local(source: &Path, audios_dir: &Path) -> Result<AcquiredAudio> {
    if !source.is_file() {
        return Err(PrateError::Acquisition(AcquisitionError::Filesystem(
            format!("File not found: {}", source.display()),
        )));
    }
    if !has_allowed_extension(source) {
        return Err(PrateError::Acquisition(AcquisitionError::UnsupportedSource(
            format!(
                "'{}' does not have an allowed audio extension ({})",
                source.display(),
                ALLOWED_AUDIO_EXTENSIONS.join(", ")
            ),
        )));
    }

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let target = audios_dir.join(format!("{}.{}", sanitize_name(stem), ext));

    if target.is_file() {
        info!("Audio already present: {}", target.display());
        return Ok(AcquiredAudio::from_stored(target, SourceOrigin::Local));
    }

    std::fs::copy(source, &target).map_err(|e| {
        PrateError::Acquisition(AcquisitionError::Filesystem(format!(
            "Copy to {} failed: {}",
            target.display(),
            e
        )))
    })?;
    info!("Copied {} into project", source.display());

    Ok(AcquiredAudio::from_stored(target, SourceOrigin::Local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_allowed_extension() {
        assert!(has_allowed_extension(Path::new("a.mp3")));
        assert!(has_allowed_extension(Path::new("a.M4A")));
        assert!(has_allowed_extension(Path::new("/x/y/video.mp4")));
        assert!(!has_allowed_extension(Path::new("a.webm")));
        assert!(!has_allowed_extension(Path::new("a.txt")));
        assert!(!has_allowed_extension(Path::new("noext")));
    }

    #[test]
    fn test_is_remote_source() {
        assert!(is_remote_source("https://example.com/watch?v=abc"));
        assert!(is_remote_source("http://example.com/a.mp3"));
        assert!(!is_remote_source("/home/user/a.mp3"));
        assert!(!is_remote_source("a.mp3"));
        assert!(!is_remote_source("file:///home/user/a.mp3"));
    }

    #[test]
    fn test_acquire_local_copies_and_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let audios = dir.path().join("audios");
        std::fs::create_dir(&audios).unwrap();
        let source = dir.path().join("my talk!.MP3");
        std::fs::write(&source, b"audio-bytes").unwrap();

        let acquired = acquire_local(&source, &audios).unwrap();
        assert_eq!(acquired.base_name, "my_talk_");
        assert_eq!(acquired.origin, SourceOrigin::Local);
        assert!(audios.join("my_talk_.mp3").is_file());
    }

    #[test]
    fn test_acquire_local_reuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let audios = dir.path().join("audios");
        std::fs::create_dir(&audios).unwrap();
        std::fs::write(audios.join("talk.mp3"), b"already-here").unwrap();
        let source = dir.path().join("talk.mp3");
        std::fs::write(&source, b"new-bytes").unwrap();

        acquire_local(&source, &audios).unwrap();
        assert_eq!(std::fs::read(audios.join("talk.mp3")).unwrap(), b"already-here");
    }

    #[test]
    fn test_acquire_local_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let audios = dir.path().join("audios");
        std::fs::create_dir(&audios).unwrap();

        let missing = acquire_local(Path::new("/no/such/file.mp3"), &audios).unwrap_err();
        assert!(matches!(
            missing,
            PrateError::Acquisition(AcquisitionError::Filesystem(_))
        ));

        let doc = dir.path().join("notes.pdf");
        std::fs::write(&doc, b"pdf").unwrap();
        let unsupported = acquire_local(&doc, &audios).unwrap_err();
        assert!(matches!(
            unsupported,
            PrateError::Acquisition(AcquisitionError::UnsupportedSource(_))
        ));
    }
}
