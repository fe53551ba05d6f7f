//! HTTP handlers, one module per record kind plus transcription.

pub mod decisions;
pub mod experiences;
pub mod procedures;
pub mod thoughts;
pub mod transcriptions;
