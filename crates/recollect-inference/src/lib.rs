//! # recollect-inference
//!
//! Wrappers around the two external services recollect leans on:
//!
//! - **Enrichment**: an Ollama chat endpoint turns raw thought text into a
//!   structured [`ThoughtAnalysis`](recollect_core::ThoughtAnalysis) using
//!   schema-constrained output.
//! - **Transcription**: an OpenAI-compatible Whisper endpoint turns uploaded
//!   audio into text with segment timestamps.
//!
//! Both are behind traits so the HTTP layer and tests can swap in stubs.

pub mod analysis;
pub mod transcription;

pub use analysis::{AnalysisBackend, OllamaBackend};
pub use transcription::{
    TranscribeOptions, TranscriptionBackend, TranscriptionResult, TranscriptionSegment,
    TranscriptionWord, WhisperBackend,
};
