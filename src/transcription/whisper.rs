//! Local Whisper transcription backend.
//!
//! Audio is decoded to 16 kHz mono f32 PCM with ffmpeg, then run through
//! whisper.cpp via the `whisper-rs` bindings. Inference is CPU-bound and
//! runs on the blocking thread pool.

use super::{Transcriber, Transcript, TranscriptSegment};
use crate::error::{PrateError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Sample rate whisper.cpp expects.
const WHISPER_SAMPLE_RATE: f64 = 16_000.0;

/// Whisper transcriber over locally cached ggml weights.
pub struct WhisperLocalTranscriber {
    context: Arc<WhisperContext>,
    cpu_threads: usize,
}

impl WhisperLocalTranscriber {
    /// Load model weights from the cache.
    ///
    /// The weight file fixes the numeric precision; `compute_type` from the
    /// app configuration is recorded for diagnostics only.
    #[instrument(skip_all, fields(model = %model_path.display()))]
    pub fn load(model_path: &Path, cpu_threads: usize, compute_type: &str) -> Result<Self> {
        info!(
            "Loading model ({} threads, compute type '{}')",
            cpu_threads, compute_type
        );

        let context = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| {
            PrateError::Transcription(format!(
                "Failed to load model {}: {}",
                model_path.display(),
                e
            ))
        })?;

        Ok(Self {
            context: Arc::new(context),
            cpu_threads,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperLocalTranscriber {
    #[instrument(skip(self), fields(audio = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let samples = decode_to_pcm(audio_path).await?;
        debug!(
            "Decoded {:.1}s of audio",
            samples.len() as f64 / WHISPER_SAMPLE_RATE
        );

        let context = self.context.clone();
        let threads = self.cpu_threads;
        let transcript =
            tokio::task::spawn_blocking(move || run_whisper(&context, &samples, threads))
                .await
                .map_err(|e| {
                    PrateError::Transcription(format!("Transcription task panicked: {e}"))
                })??;

        info!(
            "Transcribed {} segments ({:.1}s)",
            transcript.segments.len(),
            transcript.duration_seconds
        );
        Ok(transcript)
    }
}

/// Run whisper.cpp over decoded samples. Blocking.
fn run_whisper(context: &WhisperContext, samples: &[f32], threads: usize) -> Result<Transcript> {
    let mut state = context
        .create_state()
        .map_err(|e| PrateError::Transcription(format!("Failed to create state: {e}")))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(threads as i32);
    params.set_language(Some("auto"));
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);

    state
        .full(params, samples)
        .map_err(|e| PrateError::Transcription(format!("Inference failed: {e}")))?;

    let num_segments = state
        .full_n_segments()
        .map_err(|e| PrateError::Transcription(format!("Failed to read segments: {e}")))?;

    let mut segments = Vec::new();
    let mut total_confidence = 0.0f32;
    for i in 0..num_segments {
        let text = match state.full_get_segment_text_lossy(i) {
            Ok(text) => text,
            Err(_) => continue,
        };

        // t0/t1 are centiseconds
        let start = state.full_get_segment_t0(i).unwrap_or(0) as f64 / 100.0;
        let end = state.full_get_segment_t1(i).unwrap_or(0) as f64 / 100.0;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        total_confidence += segment_confidence(trimmed);
        segments.push(TranscriptSegment::new(start, end, trimmed));
    }

    let language = state
        .full_lang_id()
        .ok()
        .and_then(whisper_rs::get_lang_str)
        .map(|s| s.to_string());

    let confidence = if segments.is_empty() {
        None
    } else {
        Some(total_confidence / segments.len() as f32)
    };

    Ok(Transcript::new(segments, language, confidence))
}

/// Length-based confidence estimate for one segment.
fn segment_confidence(text: &str) -> f32 {
    (text.len() as f32 / 100.0).min(0.9) + 0.1
}

/// Decode any supported media file to 16 kHz mono f32 PCM via ffmpeg.
async fn decode_to_pcm(path: &Path) -> Result<Vec<f32>> {
    let result = Command::new("ffmpeg")
        .arg("-i").arg(path)
        .arg("-vn")
        .arg("-f").arg("f32le")
        .arg("-ac").arg("1")
        .arg("-ar").arg("16000")
        .arg("-loglevel").arg("error")
        .arg("-")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PrateError::ToolNotFound("ffmpeg".into()));
        }
        Err(e) => {
            return Err(PrateError::Transcription(format!("ffmpeg failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PrateError::Transcription(format!(
            "ffmpeg could not decode {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    Ok(bytes_to_samples(&output.stdout))
}

/// Reinterpret little-endian f32 bytes as samples.
fn bytes_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_samples() {
        let mut bytes = Vec::new();
        for value in [0.0f32, 1.0, -0.5] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        // trailing partial frame is dropped
        bytes.push(0xFF);

        let samples = bytes_to_samples(&bytes);
        assert_eq!(samples, vec![0.0, 1.0, -0.5]);
    }

    #[test]
    fn test_segment_confidence_bounds() {
        assert!((segment_confidence("hi") - 0.12).abs() < 0.001);
        assert!((segment_confidence(&"x".repeat(500)) - 1.0).abs() < 0.001);
    }
}
