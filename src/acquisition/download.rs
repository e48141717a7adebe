//! Remote audio download via yt-dlp.
//!
//! Downloads best-available audio for a URL, transcodes it to MP3, and
//! stores it in the project's audio folder named after the media title.
//! Failure causes are kept distinct (network, unsupported source,
//! extraction, filesystem) instead of being collapsed into one.

use super::{AcquiredAudio, SourceOrigin};
use crate::error::{AcquisitionError, PrateError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Download and extract audio from a URL into `audios_dir`.
///
/// The stored file is named `<title>.mp3` by yt-dlp's output template.
/// Returns the stored asset, including its title-derived base name.
#[instrument(skip(audios_dir), fields(url = %url))]
pub async fn acquire_url(url: &str, audios_dir: &Path) -> Result<AcquiredAudio> {
    std::fs::create_dir_all(audios_dir).map_err(|e| {
        PrateError::Acquisition(AcquisitionError::Filesystem(format!(
            "Cannot create {}: {}",
            audios_dir.display(),
            e
        )))
    })?;

    let before = snapshot(audios_dir)?;

    info!("Downloading audio from {}", url);
    let template = audios_dir.join("%(title)s.%(ext)s");

    let result = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("0")
        .arg("--output").arg(template.to_str().unwrap_or_default())
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg("--print").arg("after_move:filepath")
        .arg("--no-simulate")
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PrateError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(PrateError::Acquisition(AcquisitionError::Filesystem(
                format!("yt-dlp execution failed: {e}"),
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PrateError::Acquisition(classify_failure(&stderr)));
    }

    // yt-dlp prints the final path; fall back to a directory diff when the
    // print is missing (older yt-dlp builds).
    let printed = String::from_utf8_lossy(&output.stdout);
    let stored = printed
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .or_else(|| new_audio_file(audios_dir, &before));

    let stored = stored.ok_or_else(|| {
        PrateError::Acquisition(AcquisitionError::Extraction(
            "Audio file not found after download".to_string(),
        ))
    })?;

    debug!("Stored {}", stored.display());
    Ok(AcquiredAudio::from_stored(stored, SourceOrigin::Remote))
}

/// Map yt-dlp stderr to a failure kind.
fn classify_failure(stderr: &str) -> AcquisitionError {
    let lower = stderr.to_lowercase();

    if lower.contains("unsupported url")
        || lower.contains("is not a valid url")
        || lower.contains("no video formats")
    {
        return AcquisitionError::UnsupportedSource(first_error_line(stderr));
    }

    if lower.contains("unable to download")
        || lower.contains("http error")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("network")
        || lower.contains("name resolution")
        || lower.contains("getaddrinfo")
    {
        return AcquisitionError::Network(first_error_line(stderr));
    }

    if lower.contains("no space left") || lower.contains("permission denied") {
        return AcquisitionError::Filesystem(first_error_line(stderr));
    }

    AcquisitionError::Extraction(first_error_line(stderr))
}

/// The first non-empty stderr line, which yt-dlp uses for its error summary.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

fn snapshot(dir: &Path) -> Result<HashSet<PathBuf>> {
    let mut files = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        files.insert(entry?.path());
    }
    Ok(files)
}

/// Find an mp3 that appeared since the snapshot was taken.
fn new_audio_file(dir: &Path, before: &HashSet<PathBuf>) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .find(|p| {
            !before.contains(p)
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unsupported() {
        let err = classify_failure("ERROR: Unsupported URL: https://example.com/page");
        assert!(matches!(err, AcquisitionError::UnsupportedSource(_)));
    }

    #[test]
    fn test_classify_network() {
        for stderr in [
            "ERROR: unable to download video data: HTTP Error 403: Forbidden",
            "ERROR: Connection reset by peer",
            "ERROR: [generic] error: The read operation timed out",
        ] {
            let err = classify_failure(stderr);
            assert!(matches!(err, AcquisitionError::Network(_)), "{stderr}");
        }
    }

    #[test]
    fn test_classify_filesystem() {
        let err = classify_failure("ERROR: unable to write file: Permission denied");
        assert!(matches!(err, AcquisitionError::Filesystem(_)));
    }

    #[test]
    fn test_classify_extraction_fallback() {
        let err = classify_failure("ERROR: Postprocessing: audio conversion failed");
        assert!(matches!(err, AcquisitionError::Extraction(_)));
    }

    #[test]
    fn test_first_error_line() {
        assert_eq!(first_error_line("\n  ERROR: boom\nmore"), "ERROR: boom");
        assert_eq!(first_error_line(""), "unknown error");
    }

    #[test]
    fn test_new_audio_file_diff() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.mp3"), b"x").unwrap();
        let before = snapshot(dir.path()).unwrap();

        assert!(new_audio_file(dir.path(), &before).is_none());

        std::fs::write(dir.path().join("Fresh Title.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("note.txt"), b"x").unwrap();
        let found = new_audio_file(dir.path(), &before).unwrap();
        assert_eq!(found.file_name().unwrap(), "Fresh Title.mp3");
    }
}
