//! Wiremock tests for the Ollama enrichment and Whisper transcription backends.

use recollect_core::{Error, ThoughtKind, Urgency};
use recollect_inference::analysis::OllamaBackend;
use recollect_inference::transcription::{TranscribeOptions, WhisperBackend};
use recollect_inference::{AnalysisBackend, TranscriptionBackend};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_backend(server: &MockServer) -> OllamaBackend {
    OllamaBackend::new(server.uri(), "test-model".to_string(), 5)
}

fn whisper_backend(server: &MockServer) -> WhisperBackend {
    WhisperBackend::new(server.uri(), "test-whisper".to_string(), 5)
}

#[tokio::test]
async fn test_analyze_parses_schema_constrained_reply() {
    let server = MockServer::start().await;

    let analysis_json = serde_json::json!({
        "processed": "Migrate the container registry to Harbor.",
        "categories": ["infrastructure"],
        "tags": ["registry", "harbor"],
        "type": "task",
        "priority": "high",
        "summary": "Registry migration"
    });
    let reply = serde_json::json!({
        "model": "test-model",
        "message": {
            "role": "assistant",
            "content": analysis_json.to_string()
        },
        "done": true
    });

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .expect(1)
        .mount(&server)
        .await;

    let analysis = ollama_backend(&server)
        .analyze("we should move the registry to harbor asap")
        .await
        .unwrap();

    assert_eq!(analysis.kind, ThoughtKind::Task);
    assert_eq!(analysis.priority, Some(Urgency::High));
    assert_eq!(analysis.tags, vec!["registry", "harbor"]);
    assert_eq!(analysis.summary, "Registry migration");
}

#[tokio::test]
async fn test_analyze_maps_server_error_to_inference() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = ollama_backend(&server).analyze("anything").await.unwrap_err();
    match err {
        Error::Inference(msg) => assert!(msg.contains("500")),
        other => panic!("expected Inference error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_analyze_rejects_non_schema_reply() {
    let server = MockServer::start().await;

    // Model returned prose instead of the constrained JSON.
    let reply = serde_json::json!({
        "message": { "role": "assistant", "content": "Sure! Here's my analysis:" },
        "done": true
    });

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let err = ollama_backend(&server).analyze("anything").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[tokio::test]
async fn test_analyze_rejects_unknown_thought_type() {
    let server = MockServer::start().await;

    let analysis_json = serde_json::json!({
        "processed": "x",
        "categories": [],
        "tags": [],
        "type": "musing",
        "summary": "x"
    });
    let reply = serde_json::json!({
        "message": { "role": "assistant", "content": analysis_json.to_string() },
        "done": true
    });

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let err = ollama_backend(&server).analyze("anything").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[tokio::test]
async fn test_ollama_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&server)
        .await;

    assert!(ollama_backend(&server).health_check().await.unwrap());
}

#[tokio::test]
async fn test_transcribe_returns_text_and_segments() {
    let server = MockServer::start().await;

    let reply = serde_json::json!({
        "text": "Hello world. This is a test.",
        "segments": [
            {"start": 0.0, "end": 2.5, "text": "Hello world."},
            {"start": 2.5, "end": 5.0, "text": "This is a test."}
        ],
        "language": "en",
        "duration": 5.0
    });

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .expect(1)
        .mount(&server)
        .await;

    let result = whisper_backend(&server)
        .transcribe(b"RIFF....WAVE", "audio/wav", &TranscribeOptions::default())
        .await
        .unwrap();

    assert_eq!(result.text, "Hello world. This is a test.");
    assert_eq!(result.segments.len(), 2);
    assert_eq!(result.segments[0].end_secs, 2.5);
    assert_eq!(result.language.as_deref(), Some("en"));
    assert_eq!(result.duration_secs, Some(5.0));
    assert!(result.words.is_empty());
}

#[tokio::test]
async fn test_transcribe_surfaces_word_timestamps() {
    let server = MockServer::start().await;

    let reply = serde_json::json!({
        "text": "hello",
        "words": [{"start": 0.0, "end": 0.4, "word": "hello"}]
    });

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let options = TranscribeOptions {
        word_timestamps: true,
        ..Default::default()
    };
    let result = whisper_backend(&server)
        .transcribe(b"RIFF....WAVE", "audio/wav", &options)
        .await
        .unwrap();

    assert_eq!(result.words.len(), 1);
    assert_eq!(result.words[0].word, "hello");
}

#[tokio::test]
async fn test_transcribe_falls_back_to_language_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "hola"})))
        .mount(&server)
        .await;

    let options = TranscribeOptions {
        language: Some("es".to_string()),
        ..Default::default()
    };
    let result = whisper_backend(&server)
        .transcribe(b"ID3", "audio/mpeg", &options)
        .await
        .unwrap();

    assert_eq!(result.language.as_deref(), Some("es"));
}

#[tokio::test]
async fn test_transcribe_maps_server_error_to_transcription() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let err = whisper_backend(&server)
        .transcribe(b"RIFF....WAVE", "audio/wav", &TranscribeOptions::default())
        .await
        .unwrap_err();
    match err {
        Error::Transcription(msg) => assert!(msg.contains("503")),
        other => panic!("expected Transcription error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transcribe_rejects_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = whisper_backend(&server)
        .transcribe(b"RIFF....WAVE", "audio/wav", &TranscribeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transcription(_)));
}
