//! recollect-api - HTTP API server for recollect

mod handlers;
mod query_types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recollect_db::Database;
use recollect_inference::{AnalysisBackend, OllamaBackend, TranscriptionBackend, WhisperBackend};

/// Upper bound on request bodies; audio uploads dominate.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Thought enrichment backend.
    pub analysis: Arc<dyn AnalysisBackend>,
    /// Speech-to-text backend; None when WHISPER_BASE_URL is not configured.
    pub transcription: Option<Arc<dyn TranscriptionBackend>>,
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(recollect_core::Error),
}

impl From<recollect_core::Error> for ApiError {
    fn from(err: recollect_core::Error) -> Self {
        match err {
            recollect_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            recollect_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            recollect_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            recollect_core::Error::Inference(msg) | recollect_core::Error::Transcription(msg) => {
                ApiError::ServiceUnavailable(msg)
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(err) => {
                error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// SYSTEM HANDLERS
// =============================================================================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "recollect-api",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/thoughts",
            get(handlers::thoughts::list_thoughts).post(handlers::thoughts::create_thought),
        )
        .route(
            "/thoughts/:id",
            get(handlers::thoughts::get_thought)
                .put(handlers::thoughts::update_thought)
                .delete(handlers::thoughts::delete_thought),
        )
        .route(
            "/procedures",
            get(handlers::procedures::list_procedures).post(handlers::procedures::create_procedure),
        )
        .route(
            "/procedures/:id",
            get(handlers::procedures::get_procedure)
                .put(handlers::procedures::update_procedure)
                .delete(handlers::procedures::delete_procedure),
        )
        .route(
            "/procedures/:id/steps",
            axum::routing::post(handlers::procedures::add_steps),
        )
        .route(
            "/procedures/:id/steps/:step_id",
            axum::routing::put(handlers::procedures::update_step),
        )
        .route(
            "/technical-decisions",
            get(handlers::decisions::list_decisions).post(handlers::decisions::create_decision),
        )
        .route(
            "/technical-decisions/:id",
            get(handlers::decisions::get_decision)
                .put(handlers::decisions::update_decision)
                .delete(handlers::decisions::delete_decision),
        )
        .route(
            "/experiences",
            get(handlers::experiences::list_experiences)
                .post(handlers::experiences::create_experience),
        )
        .route(
            "/experiences/:id",
            get(handlers::experiences::get_experience)
                .put(handlers::experiences::update_experience)
                .delete(handlers::experiences::delete_experience),
        )
        .route(
            "/transcriptions",
            axum::routing::post(handlers::transcriptions::transcribe_audio),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   RUST_LOG    - standard env filter (default: "recollect_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recollect_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("recollect-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/recollect".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .unwrap_or(8000);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Enrichment backend
    let analysis = OllamaBackend::from_env();
    info!("Enrichment backend ready: {}", analysis.model_name());

    // Transcription backend is optional; the endpoint answers 503 without it
    let transcription: Option<Arc<dyn TranscriptionBackend>> = match WhisperBackend::from_env() {
        Some(backend) => {
            info!("Transcription backend ready: {}", backend.model_name());
            Some(Arc::new(backend))
        }
        None => {
            info!("Transcription backend not configured (WHISPER_BASE_URL unset)");
            None
        }
    };

    let state = AppState {
        db: Arc::new(db),
        analysis: Arc::new(analysis),
        transcription,
    };

    let app = build_router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use recollect_core::{Result, ThoughtAnalysis};
    use recollect_inference::{TranscribeOptions, TranscriptionResult};
    use tower::ServiceExt;

    struct StubAnalysis;

    #[async_trait]
    impl AnalysisBackend for StubAnalysis {
        async fn analyze(&self, _text: &str) -> Result<ThoughtAnalysis> {
            Err(recollect_core::Error::Inference("stub offline".into()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubTranscription;

    #[async_trait]
    impl TranscriptionBackend for StubTranscription {
        async fn transcribe(
            &self,
            _audio_data: &[u8],
            _mime_type: &str,
            _options: &TranscribeOptions,
        ) -> Result<TranscriptionResult> {
            Ok(TranscriptionResult {
                text: "stub text".into(),
                segments: vec![],
                words: vec![],
                language: Some("en".into()),
                duration_secs: Some(1.0),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "stub-whisper"
        }
    }

    // Lazy pool: these tests exercise paths that never reach the database.
    fn test_state(transcription: Option<Arc<dyn TranscriptionBackend>>) -> AppState {
        let pool = recollect_db::create_pool_lazy("postgres://localhost/recollect_unused")
            .expect("lazy pool");
        AppState {
            db: Arc::new(Database::new(pool)),
            analysis: Arc::new(StubAnalysis),
            transcription,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_service() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "recollect-api");
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_thought_rejects_blank_text() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/thoughts")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn test_create_thought_enrichment_failure_is_503() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/thoughts")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "remember to rotate the certs"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transcription_unconfigured_is_503() {
        let app = build_router(test_state(None));
        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"audio\"; filename=\"a.wav\"\r\n",
            "Content-Type: audio/wav\r\n\r\n",
            "RIFFdata\r\n",
            "--BOUNDARY--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transcriptions")
                    .header("content-type", "multipart/form-data; boundary=BOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transcription_rejects_unsupported_type() {
        let app = build_router(test_state(Some(Arc::new(StubTranscription))));
        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"audio\"; filename=\"clip.mp4\"\r\n",
            "Content-Type: video/mp4\r\n\r\n",
            "mp4data\r\n",
            "--BOUNDARY--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transcriptions")
                    .header("content-type", "multipart/form-data; boundary=BOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Unsupported"));
    }

    #[tokio::test]
    async fn test_transcription_rejects_empty_file() {
        let app = build_router(test_state(Some(Arc::new(StubTranscription))));
        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"audio\"; filename=\"a.wav\"\r\n",
            "Content-Type: audio/wav\r\n\r\n",
            "\r\n",
            "--BOUNDARY--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transcriptions")
                    .header("content-type", "multipart/form-data; boundary=BOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transcription_happy_path_with_stub() {
        let app = build_router(test_state(Some(Arc::new(StubTranscription))));
        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"audio\"; filename=\"a.wav\"\r\n",
            "Content-Type: audio/wav\r\n\r\n",
            "RIFFdata\r\n",
            "--BOUNDARY--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transcriptions")
                    .header("content-type", "multipart/form-data; boundary=BOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["text"], "stub text");
        assert_eq!(json["model"], "stub-whisper");
    }

    #[tokio::test]
    async fn test_add_steps_rejects_empty_batch() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/procedures/1/steps")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"steps": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_limit_is_400() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/thoughts?limit=500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_negative_offset_is_400() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/experiences?offset=-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_repeated_tag_params_survive_extraction() {
        // The out-of-range limit trips validation inside the handler, so a
        // "limit" error proves the repeated tags deserialized cleanly instead
        // of being rejected at extraction.
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/technical-decisions?tags=infra&tags=oncall&limit=500")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_unknown_enum_value_is_client_error() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/thoughts/1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type": "musing"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
