//! Speech-to-text transcription for Prate.
//!
//! Transcription runs locally: ggml Whisper weights live in the shared
//! model cache and inference happens in-process, using the thread count
//! from the app configuration. The [`Transcriber`] trait is the seam for
//! tests and alternative backends.

mod model_cache;
mod whisper;

pub use model_cache::ModelCache;
pub use whisper::WhisperLocalTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One timed segment of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Recognized text.
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// A complete transcription result for one audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Ordered segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
    /// Detected language code, if the backend reports one.
    pub language: Option<String>,
    /// Backend confidence in the result, 0.0 to 1.0.
    pub confidence: Option<f32>,
    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    pub fn new(
        segments: Vec<TranscriptSegment>,
        language: Option<String>,
        confidence: Option<f32>,
    ) -> Self {
        let duration_seconds = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);
        Self {
            segments,
            language,
            confidence,
            duration_seconds,
        }
    }

    /// Join segment texts with the given separator.
    ///
    /// Each segment is trimmed first and empty segments are skipped, so the
    /// output never carries doubled whitespace from segment boundaries.
    pub fn joined_text(&self, separator: &str) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Trait for transcription backends.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into timed segments.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_uses_separator() {
        let transcript = Transcript::new(
            vec![
                TranscriptSegment::new(0.0, 1.0, "hello "),
                TranscriptSegment::new(1.0, 2.0, "world"),
            ],
            None,
            None,
        );
        assert_eq!(transcript.joined_text(" "), "hello world");
        assert_eq!(transcript.joined_text("\n"), "hello\nworld");
    }

    #[test]
    fn test_joined_text_skips_empty_segments() {
        let transcript = Transcript::new(
            vec![
                TranscriptSegment::new(0.0, 1.0, "one"),
                TranscriptSegment::new(1.0, 2.0, "   "),
                TranscriptSegment::new(2.0, 3.0, "two"),
            ],
            None,
            None,
        );
        assert_eq!(transcript.joined_text(" "), "one two");
    }

    #[test]
    fn test_duration_from_last_segment() {
        let transcript = Transcript::new(
            vec![TranscriptSegment::new(0.0, 12.5, "x")],
            Some("en".to_string()),
            Some(0.9),
        );
        assert!((transcript.duration_seconds - 12.5).abs() < f64::EPSILON);

        let empty = Transcript::new(Vec::new(), None, None);
        assert_eq!(empty.duration_seconds, 0.0);
    }
}
