//! Language-model enrichment of raw thought text via Ollama.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use recollect_core::{Error, Result, ThoughtAnalysis};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default enrichment model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1:8b";

/// Timeout for enrichment requests (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend that enriches raw thought text into a structured analysis.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze text; the result is all-or-nothing, never partially filled.
    async fn analyze(&self, text: &str) -> Result<ThoughtAnalysis>;

    /// Check if the enrichment backend is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Ollama chat-completion backend with schema-constrained output.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// JSON schema handed to Ollama's `format` field so the model is constrained
/// to emit exactly the analysis shape.
fn analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "processed": { "type": "string" },
            "categories": { "type": "array", "items": { "type": "string" } },
            "tags": { "type": "array", "items": { "type": "string" } },
            "type": {
                "type": "string",
                "enum": ["idea", "task", "observation", "reminder", "question", "note"]
            },
            "priority": {
                "type": ["string", "null"],
                "enum": ["low", "medium", "high", null]
            },
            "summary": { "type": "string" }
        },
        "required": ["processed", "categories", "tags", "type", "summary"]
    })
}

fn build_prompt(text: &str) -> String {
    format!(
        "You are an assistant that helps a senior DevOps engineer organize \
         and manage their thoughts.\n\
         \n\
         Take the raw, unstructured thought below and return JSON with:\n\
         - processed: a cleaned-up, structured version of the thought\n\
         - categories: categories this thought relates to, e.g. \
         [\"infrastructure\", \"team\", \"idea\", \"bug\", \"workflow\"]\n\
         - tags: relevant tags or keywords\n\
         - type: one of [\"idea\", \"task\", \"observation\", \"reminder\", \
         \"question\", \"note\"]\n\
         - priority: \"low\", \"medium\" or \"high\" if you detect urgency, \
         otherwise null\n\
         - summary: a short summary of the core idea\n\
         \n\
         Respond ONLY with valid JSON matching this schema.\n\
         \n\
         Thought:\n{text}"
    )
}

impl OllamaBackend {
    /// Create a new backend with explicit configuration.
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            url = %base_url,
            model = %model,
            timeout_secs,
            "Initializing Ollama enrichment backend"
        );

        Self {
            client,
            base_url,
            model,
            timeout_secs,
        }
    }

    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_BASE").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, model, timeout_secs)
    }

    /// Base URL this backend talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AnalysisBackend for OllamaBackend {
    async fn analyze(&self, text: &str) -> Result<ThoughtAnalysis> {
        let url = format!("{}/api/chat", self.base_url);
        let prompt = build_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
            format: analysis_schema(),
        };

        debug!(model = %self.model, text_len = text.len(), "Sending enrichment request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("enrichment request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Ollama returned an error");
            return Err(Error::Inference(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("unreadable Ollama response: {e}")))?;

        let analysis: ThoughtAnalysis = serde_json::from_str(&chat.message.content)
            .map_err(|e| Error::Inference(format!("model emitted invalid analysis: {e}")))?;

        debug!(
            kind = analysis.kind.as_str(),
            tag_count = analysis.tags.len(),
            "Enrichment complete"
        );
        Ok(analysis)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_every_analysis_field() {
        let schema = analysis_schema();
        let properties = schema["properties"].as_object().unwrap();
        for field in ["processed", "categories", "tags", "type", "priority", "summary"] {
            assert!(properties.contains_key(field), "schema missing {field}");
        }
        // priority is the one optional field
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(!required.contains(&"priority"));
    }

    #[test]
    fn test_prompt_embeds_the_thought_verbatim() {
        let prompt = build_prompt("migrate the registry to harbor");
        assert!(prompt.ends_with("migrate the registry to harbor"));
    }

    #[test]
    fn test_chat_request_is_non_streaming() {
        let prompt = build_prompt("x");
        let request = ChatRequest {
            model: "test-model",
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            stream: false,
            format: analysis_schema(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["format"].is_object());
    }

    #[test]
    fn test_backend_construction() {
        let backend = OllamaBackend::new(
            "http://localhost:11434".to_string(),
            "llama3.1:8b".to_string(),
            30,
        );
        assert_eq!(backend.model_name(), "llama3.1:8b");
        assert_eq!(backend.base_url(), "http://localhost:11434");
        assert_eq!(backend.timeout_secs, 30);
    }
}
