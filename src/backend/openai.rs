//! Backend for OpenAI-compatible APIs.
//!
//! [`OpenAiBackend`] covers OpenAI itself and the servers that mimic it:
//! vLLM, llama.cpp server, LM Studio, Ollama's `/v1/` endpoint, and so on.
//!
//! Endpoint: `/v1/chat/completions`, non-streaming.

use super::{Backend, ChatRequest, LlmResponse};
use crate::error::{JobError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Environment variable holding the bearer token.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Backend for any OpenAI-compatible chat-completions API.
///
/// # Example
///
/// ```
/// use llm_job::backend::OpenAiBackend;
///
/// let backend = OpenAiBackend::new();
/// let with_key = OpenAiBackend::new().with_api_key("sk-...");
/// ```
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Optional API key. If set, sent as `Authorization: Bearer {key}`.
    pub(crate) api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.chars().count() > 6 {
                        format!("{}***", k.chars().take(6).collect::<String>())
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .finish()
    }
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend without authentication.
    pub fn new() -> Self {
        Self { api_key: None }
    }

    /// Create a backend using `OPENAI_API_KEY` when it is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new().with_api_key(key),
            _ => Self::new(),
        }
    }

    /// Set the API key for authentication.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Full chat-completions URL for a normalized base URL.
    fn completions_url(base_url: &str) -> String {
        format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
    }

    /// Build the reqwest request with appropriate headers.
    fn build_http_request(
        &self,
        client: &Client,
        url: &str,
        body: &ChatRequest,
    ) -> reqwest::RequestBuilder {
        let mut req = client.post(url).json(body);

        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        req
    }

    /// First choice's message content, or `""` when the shape is unexpected.
    fn extract_content(json_resp: &Value) -> String {
        json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    /// Extract metadata from an OpenAI response.
    fn extract_metadata(json_resp: &Value) -> Option<Value> {
        let mut meta = serde_json::Map::new();
        if let Some(v) = json_resp.get("usage") {
            meta.insert("usage".into(), v.clone());
        }
        if let Some(v) = json_resp.get("model") {
            meta.insert("model".into(), v.clone());
        }
        if let Some(v) = json_resp.get("id") {
            meta.insert("id".into(), v.clone());
        }
        if meta.is_empty() {
            None
        } else {
            Some(Value::Object(meta))
        }
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<LlmResponse> {
        let url = Self::completions_url(base_url);

        let resp = self
            .build_http_request(client, &url, request)
            .send()
            .await
            .map_err(|e| {
                JobError::Backend(format!("Failed to connect to LLM at {}: {}", url, e))
            })?;

        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(JobError::Backend(format!("HTTP {}: {}", status, text)));
        }

        let json_resp: Value = resp.json().await.map_err(|e| {
            JobError::Backend(format!("Malformed response body from {}: {}", url, e))
        })?;

        Ok(LlmResponse {
            text: Self::extract_content(&json_resp),
            status,
            metadata: Self::extract_metadata(&json_resp),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
