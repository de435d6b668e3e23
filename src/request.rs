//! Chat request construction.

use crate::backend::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use crate::config::JobDefinition;
use crate::response_format::ResponseFormat;
use crate::types::InputRecord;

/// Assemble the chat request for one record.
///
/// - A system message is added only when `system_prompt` is present and not
///   blank; its content is sent untrimmed.
/// - The user message is multi-modal only when the job enables images *and*
///   the record has at least one.
/// - `params` from the job are flattened after the base fields.
pub fn build_request(
    job: &JobDefinition,
    record: &InputRecord,
    user_prompt: String,
    system_prompt: Option<String>,
    format: &ResponseFormat,
) -> ChatRequest {
    let mut messages = Vec::with_capacity(2);

    if let Some(system) = system_prompt {
        if !system.trim().is_empty() {
            messages.push(ChatMessage::system(system));
        }
    }

    messages.push(ChatMessage::user(user_content(
        job.use_images,
        record,
        user_prompt,
    )));

    ChatRequest {
        model: job.model.clone(),
        messages,
        response_format: format.directive(),
        params: job.params.clone(),
    }
}

fn user_content(use_images: bool, record: &InputRecord, prompt: String) -> MessageContent {
    if !use_images || record.images.is_empty() {
        return MessageContent::Text(prompt);
    }

    let mut parts = Vec::with_capacity(record.images.len() + 1);
    parts.push(ContentPart::Text { text: prompt });
    parts.extend(
        record
            .images
            .iter()
            .map(String::as_str)
            .map(ContentPart::jpeg_base64),
    );
    MessageContent::Parts(parts)
}
