//! Speech-to-text via an OpenAI-compatible Whisper endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use recollect_core::{Error, Result};

/// Default transcription model.
pub const DEFAULT_WHISPER_MODEL: &str = "Systran/faster-whisper-base";

/// Timeout for transcription requests (seconds). Long audio takes a while.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// A segment of transcribed audio with timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// A single word with timestamps, present when word timestamps are requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionWord {
    pub start_secs: f64,
    pub end_secs: f64,
    pub word: String,
}

/// Result of audio transcription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionResult {
    /// Full transcribed text.
    pub text: String,
    /// Timestamped segments.
    pub segments: Vec<TranscriptionSegment>,
    /// Word-level timestamps when requested.
    pub words: Vec<TranscriptionWord>,
    /// Detected language (ISO 639-1 code).
    pub language: Option<String>,
    /// Total audio duration in seconds.
    pub duration_secs: Option<f64>,
}

/// Options controlling a transcription request.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// Language hint; auto-detect when absent.
    pub language: Option<String>,
    /// Ask the backend for word-level timestamps.
    pub word_timestamps: bool,
    /// Enable voice-activity-detection filtering of non-speech.
    pub vad_filter: bool,
}

/// Backend for transcribing audio files.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe audio data.
    async fn transcribe(
        &self,
        audio_data: &[u8],
        mime_type: &str,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult>;

    /// Check if the transcription backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible Whisper backend (works with Speaches/faster-whisper-server).
pub struct WhisperBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

/// OpenAI Whisper verbose_json response format.
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    #[serde(default)]
    words: Option<Vec<WhisperWord>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Deserialize)]
struct WhisperWord {
    start: f64,
    end: f64,
    word: String,
}

/// File extension matching the upload's MIME type; the backend keys codec
/// detection off the filename.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/ogg" => "ogg",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "wav",
    }
}

impl WhisperBackend {
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Self {
        info!(
            url = %base_url,
            model = %model,
            timeout_secs,
            "Initializing Whisper transcription backend"
        );
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            timeout_secs,
        }
    }

    /// Create from environment variables.
    /// Returns None if WHISPER_BASE_URL is not set; transcription is optional.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("WHISPER_BASE_URL").ok()?;
        if base_url.is_empty() {
            return None;
        }
        let model = std::env::var("WHISPER_MODEL")
            .unwrap_or_else(|_| DEFAULT_WHISPER_MODEL.to_string());
        let timeout_secs = std::env::var("WHISPER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self::new(base_url, model, timeout_secs))
    }

    /// Base URL this backend talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperBackend {
    async fn transcribe(
        &self,
        audio_data: &[u8],
        mime_type: &str,
        options: &TranscribeOptions,
    ) -> Result<TranscriptionResult> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let ext = extension_for(mime_type);

        let file_part = reqwest::multipart::Part::bytes(audio_data.to_vec())
            .file_name(format!("audio.{ext}"))
            .mime_str(mime_type)
            .map_err(|e| Error::Transcription(format!("failed to build upload: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = &options.language {
            form = form.text("language", lang.clone());
        }
        if options.word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }
        if options.vad_filter {
            form = form.text("vad_filter", "true");
        }

        debug!(
            bytes = audio_data.len(),
            mime = mime_type,
            language = options.language.as_deref(),
            "Sending transcription request"
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Transcription(format!("transcription request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Whisper returned an error");
            return Err(Error::Transcription(format!(
                "Whisper API returned {status}: {body}"
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("unreadable Whisper response: {e}")))?;

        let segments = result
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| TranscriptionSegment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text,
            })
            .collect();
        let words = result
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| TranscriptionWord {
                start_secs: w.start,
                end_secs: w.end,
                word: w.word,
            })
            .collect();

        Ok(TranscriptionResult {
            text: result.text,
            segments,
            words,
            language: result.language.or_else(|| options.language.clone()),
            duration_secs: result.duration,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
