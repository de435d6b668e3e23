//! Backend trait and the chat request/response types it speaks.
//!
//! The [`Backend`] trait abstracts over chat-completions providers. The
//! request builder produces a provider-agnostic [`ChatRequest`] whose serde
//! shape is the OpenAI chat-completions body; a backend sends it and
//! returns the first choice's text as an [`LlmResponse`].
//!
//! ## Architecture
//!
//! ```text
//! Job::process_record ──► ChatRequest ──► Backend::complete() ──► LlmResponse
//!                                               │
//!                                   ┌───────────┴───────────┐
//!                              OpenAiBackend            MockBackend
//!                          /v1/chat/completions       canned replies
//! ```

pub mod mock;
pub mod openai;

pub use mock::{MockBackend, MockReply};
pub use openai::OpenAiBackend;

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

/// A provider-agnostic chat request.
///
/// Serializes to `{model, messages, response_format?, ...params}`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier, verbatim from the job definition.
    pub model: String,

    /// System message (optional) followed by exactly one user message.
    pub messages: Vec<ChatMessage>,

    /// Output-shape directive. Omitted from the body entirely when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,

    /// Extra sampling parameters, flattened into the top level.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: Role,
    /// The message content.
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
}

/// Message content: a plain string, or a sequence of typed parts.
///
/// Backends branch on which shape they receive, so the two are kept
/// distinct on the wire: `Text` serializes as a bare JSON string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multi-modal message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// `{"type": "text", "text": ...}`
    Text { text: String },
    /// `{"type": "image_url", "image_url": {"url": ...}}`
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// An image part referencing a base64 JPEG payload as a data URI.
    pub fn jpeg_base64(payload: &str) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:image/jpeg;base64,{}", payload),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// A normalized backend response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The first choice's message content; empty if the body had none.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token usage, model, response id).
    pub metadata: Option<Value>,
}

/// Abstraction over chat-completions providers.
///
/// One call per record, no retries. Any transport failure is reported as
/// [`JobError::Backend`](crate::JobError::Backend).
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send one chat request and return the first choice's content.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}
