//! Cleanup of raw model output.
//!
//! Reasoning models wrap their scratch work in `<think>...</think>`. That
//! text is never part of the answer, so it is stripped before the answer is
//! written into a record.

use regex::Regex;
use std::sync::LazyLock;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// A complete reasoning span. Non-greedy, spans newlines, tag-literal.
static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("static regex"));

/// Extract `<think>...</think>` spans from a response.
///
/// Returns `(thinking_content, cleaned_text)`. `thinking_content` joins the
/// trimmed inner text of every span (blank spans omitted) with blank lines.
/// See [`clean_content`] for the rules applied to `cleaned_text`.
pub fn extract_thinking(text: &str) -> (Option<String>, String) {
    if !THINK_SPAN.is_match(text) {
        if text.contains(THINK_OPEN) || text.contains(THINK_CLOSE) {
            // Unterminated or orphaned tag: not reasoning markup we understand.
            return (None, text.to_string());
        }
        return (None, text.trim().to_string());
    }

    let thinking: Vec<&str> = THINK_SPAN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    let cleaned = THINK_SPAN.replace_all(text, "").trim().to_string();
    let thinking = if thinking.is_empty() {
        None
    } else {
        Some(thinking.join("\n\n"))
    };
    (thinking, cleaned)
}

/// Strip reasoning spans from model output.
///
/// - Every well-formed `<think>...</think>` span is removed and the rest is
///   trimmed. Text between spans keeps its own line breaks, so a span on its
///   own line between two paragraphs leaves a blank line behind.
/// - If there is no well-formed span but a stray `<think>` or `</think>`
///   appears, the input is returned exactly as given.
/// - Otherwise the input is only trimmed.
///
/// ```
/// use llm_job::parsing::clean_content;
///
/// assert_eq!(clean_content("<think>hmm</think>Final answer."), "Final answer.");
/// assert_eq!(clean_content("<think>never closed"), "<think>never closed");
/// ```
pub fn clean_content(raw: &str) -> String {
    extract_thinking(raw).1
}
