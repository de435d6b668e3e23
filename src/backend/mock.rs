//! Mock backend for testing without a live LLM.
//!
//! [`MockBackend`] replays scripted replies in order and records every
//! request it receives, so tests can assert on both the transformed
//! records and the exact request bodies.
//!
//! # Example
//!
//! ```
//! use llm_job::backend::MockBackend;
//!
//! let mock = MockBackend::fixed("Mocked response from API");
//! assert!(mock.requests().is_empty());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use super::{Backend, ChatRequest, LlmResponse};
use crate::error::{JobError, Result};

/// One scripted outcome of a mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text as the first choice's content.
    Content(String),
    /// Fail with a transport error carrying this message.
    Error(String),
}

/// A test backend that replays scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    /// Create a mock backend with the given canned responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Content).collect())
    }

    /// Create a mock from an explicit script of successes and failures.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Create a mock whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(vec![MockReply::Error(message.into())])
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(
        &self,
        _client: &Client,
        _base_url: &str,
        request: &ChatRequest,
    ) -> Result<LlmResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        match self.next_reply() {
            MockReply::Content(text) => Ok(LlmResponse {
                text,
                status: 200,
                metadata: None,
            }),
            MockReply::Error(message) => Err(JobError::Backend(message)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
