//! The backend handle shared by every record of a run.
//!
//! [`ExecCtx`] carries the HTTP client, the backend, the normalized base URL
//! and an optional event handler. It is constructed once, after the job
//! definition has been validated, and passed by reference into every
//! record call.

use crate::backend::{Backend, OpenAiBackend};
use crate::error::{JobError, Result};
use crate::events::EventHandler;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Per-call timeout enforced by the HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// Shared execution context for record processing.
///
/// # Example
///
/// ```
/// use llm_job::ExecCtx;
///
/// let ctx = ExecCtx::builder("https://api.example.com/v1").build().unwrap();
/// assert_eq!(ctx.base_url, "https://api.example.com");
/// ```
pub struct ExecCtx {
    /// HTTP client (cheap to clone -- uses `Arc` internally).
    pub client: Client,
    /// Base URL with any trailing `/v1` removed.
    pub base_url: String,
    /// LLM backend. Default: [`OpenAiBackend`] without a key.
    pub backend: Arc<dyn Backend>,
    /// Optional event handler for record lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtx {
    /// Create a new builder.
    pub fn builder(base_url: impl Into<String>) -> ExecCtxBuilder {
        ExecCtxBuilder {
            client: None,
            base_url: base_url.into(),
            backend: None,
            event_handler: None,
            timeout: None,
        }
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Option<Arc<dyn Backend>>,
    event_handler: Option<Arc<dyn EventHandler>>,
    timeout: Option<Duration>,
}

impl ExecCtxBuilder {
    /// Set the HTTP client. If not set, one is built with the timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the LLM backend.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use the OpenAI-compatible backend with the key from `OPENAI_API_KEY`.
    pub fn openai_from_env(mut self) -> Self {
        self.backend = Some(Arc::new(OpenAiBackend::from_env()));
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set the request timeout. Default: [`DEFAULT_TIMEOUT`].
    ///
    /// Ignored when a custom `Client` is supplied via `.client()`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> Result<ExecCtx> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .map_err(|e| JobError::Backend(format!("Failed to build HTTP client: {}", e)))?,
        };
        Ok(ExecCtx {
            client,
            base_url: normalize_endpoint(&self.base_url),
            backend: self
                .backend
                .unwrap_or_else(|| Arc::new(OpenAiBackend::new())),
            event_handler: self.event_handler,
        })
    }
}

/// Strip one trailing `/v1` or `/v1/` from an endpoint.
///
/// The backend appends its own `/v1/chat/completions`, so a job written
/// against `https://host/v1` would otherwise double the version segment.
/// Anything else is returned unchanged.
pub fn normalize_endpoint(url: &str) -> String {
    url.strip_suffix("/v1/")
        .or_else(|| url.strip_suffix("/v1"))
        .unwrap_or(url)
        .to_string()
}
