//! Audio transcription handler.
//!
//! Accepts multipart/form-data and forwards the audio to the Whisper-compatible
//! backend. The upload is validated before the backend is ever contacted.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use recollect_inference::{TranscribeOptions, TranscriptionSegment, TranscriptionWord};

use crate::{ApiError, AppState};

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/mp3",
    "audio/mpeg",
    "audio/ogg",
    "audio/flac",
    "audio/x-flac",
];

const ALLOWED_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".ogg", ".flac"];

/// Response from audio transcription.
#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<TranscriptionWord>,
    pub language: Option<String>,
    pub duration_secs: Option<f64>,
    pub model: String,
}

fn upload_is_audio(content_type: Option<&str>, filename: Option<&str>) -> bool {
    if let Some(ct) = content_type {
        if ALLOWED_CONTENT_TYPES.contains(&ct) {
            return true;
        }
    }
    if let Some(name) = filename {
        let lower = name.to_ascii_lowercase();
        if ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return true;
        }
    }
    false
}

pub async fn transcribe_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let backend = state.transcription.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable(
            "transcription backend not configured; set WHISPER_BASE_URL".to_string(),
        )
    })?;

    let mut audio: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut options = TranscribeOptions {
        vad_filter: true,
        ..Default::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {e}")))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("audio") => {
                content_type = field.content_type().map(|c| c.to_string());
                filename = field.file_name().map(|f| f.to_string());
                audio = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("read error: {e}")))?
                        .to_vec(),
                );
            }
            Some("language") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("read error: {e}")))?;
                if !value.trim().is_empty() {
                    options.language = Some(value.trim().to_string());
                }
            }
            Some("word_timestamps") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("read error: {e}")))?;
                options.word_timestamps = value == "true" || value == "1";
            }
            Some("vad_filter") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("read error: {e}")))?;
                options.vad_filter = !(value == "false" || value == "0");
            }
            _ => {} // ignore unknown fields
        }
    }

    let audio = audio
        .ok_or_else(|| ApiError::BadRequest("missing audio field in multipart form".to_string()))?;

    if audio.is_empty() {
        return Err(ApiError::BadRequest("audio file is empty".to_string()));
    }

    if !upload_is_audio(content_type.as_deref(), filename.as_deref()) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported file type: {}. Supported types: WAV, MP3, OGG, FLAC",
            content_type.as_deref().unwrap_or("unknown")
        )));
    }

    info!(
        bytes = audio.len(),
        filename = filename.as_deref(),
        language = options.language.as_deref(),
        "Transcribing upload"
    );

    let mime_type = content_type.as_deref().unwrap_or("audio/wav");
    let result = backend.transcribe(&audio, mime_type, &options).await?;

    Ok(Json(TranscriptionResponse {
        text: result.text,
        segments: result.segments,
        words: result.words,
        language: result.language,
        duration_secs: result.duration_secs,
        model: backend.model_name().to_string(),
    }))
}
