//! Prompt rendering.
//!
//! Templates are [minijinja](https://docs.rs/minijinja) sources evaluated
//! against a [`TemplateContext`] holding exactly two bindings taken from the
//! record: `texts` and `images`. Nothing else from the record or the
//! process is visible to a template.
//!
//! ```
//! use llm_job::prompt::PromptRenderer;
//! use llm_job::types::InputRecord;
//!
//! let renderer = PromptRenderer::new("Summarize: {{ texts.body }}", None).unwrap();
//! let record = InputRecord::new("a1").with_text("body", "Rust is fast.");
//! assert_eq!(renderer.render_user(&record).unwrap(), "Summarize: Rust is fast.");
//! ```

use crate::config::JobDefinition;
use crate::error::{JobError, Result};
use crate::types::InputRecord;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

const USER_TEMPLATE: &str = "user";
const SYSTEM_TEMPLATE: &str = "system";

/// The only values a template can see.
#[derive(Debug, Serialize)]
pub struct TemplateContext<'a> {
    pub texts: &'a Map<String, Value>,
    pub images: &'a [String],
}

impl<'a> From<&'a InputRecord> for TemplateContext<'a> {
    fn from(record: &'a InputRecord) -> Self {
        Self {
            texts: &record.texts,
            images: &record.images,
        }
    }
}

/// Compiled user and optional system templates.
pub struct PromptRenderer {
    env: Environment<'static>,
    has_system: bool,
}

impl std::fmt::Debug for PromptRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRenderer")
            .field("has_system", &self.has_system)
            .finish()
    }
}

impl PromptRenderer {
    /// Compile the given template sources.
    ///
    /// Syntax errors are reported as [`JobError::Config`].
    pub fn new(user_source: &str, system_source: Option<&str>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        // prompts are plain text whatever the template file is called
        env.set_auto_escape_callback(|_| AutoEscape::None);

        env.add_template_owned(USER_TEMPLATE, user_source.to_string())
            .map_err(|e| JobError::Config(format!("Invalid user template: {}", e)))?;

        if let Some(source) = system_source {
            env.add_template_owned(SYSTEM_TEMPLATE, source.to_string())
                .map_err(|e| JobError::Config(format!("Invalid system template: {}", e)))?;
        }

        Ok(Self {
            env,
            has_system: system_source.is_some(),
        })
    }

    /// Read and compile the templates named by a job definition.
    pub fn from_job(job: &JobDefinition) -> Result<Self> {
        let user = read_template(&job.user_template_path)?;
        let system = job
            .system_template_path
            .as_deref()
            .map(read_template)
            .transpose()?;
        Self::new(&user, system.as_deref())
    }

    /// Whether a system template was configured.
    pub fn has_system(&self) -> bool {
        self.has_system
    }

    /// Render the user prompt for `record`.
    pub fn render_user(&self, record: &InputRecord) -> Result<String> {
        self.render(USER_TEMPLATE, record)
    }

    /// Render the system prompt for `record`.
    ///
    /// Returns `None` when no system template is configured, which is not
    /// the same as `Some("")` from a template that renders empty.
    pub fn render_system(&self, record: &InputRecord) -> Result<Option<String>> {
        if !self.has_system {
            return Ok(None);
        }
        self.render(SYSTEM_TEMPLATE, record).map(Some)
    }

    fn render(&self, name: &str, record: &InputRecord) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template.render(TemplateContext::from(record))?;
        Ok(rendered)
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        JobError::Config(format!(
            "Failed to read template {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> InputRecord {
        InputRecord::new("r1")
            .with_text("input", "test message")
            .with_text("lang", "en")
    }

    #[test]
    fn test_render_texts() {
        let renderer = PromptRenderer::new("Test prompt: {{ texts.input }}", None).unwrap();
        assert_eq!(
            renderer.render_user(&record()).unwrap(),
            "Test prompt: test message"
        );
    }

    #[test]
    fn test_render_images_binding() {
        let renderer =
            PromptRenderer::new("{{ images | length }} image(s)", None).unwrap();
        let rec = record().with_image("AAAA").with_image("BBBB");
        assert_eq!(renderer.render_user(&rec).unwrap(), "2 image(s)");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let renderer = PromptRenderer::new(
            "{{ texts | length }}/{{ images | length }}",
            None,
        )
        .unwrap();
        let rec: InputRecord = serde_json::from_str(r#"{"id":"bare"}"#).unwrap();
        assert_eq!(renderer.render_user(&rec).unwrap(), "0/0");
    }

    #[test]
    fn test_absent_label_is_render_error() {
        let renderer = PromptRenderer::new("{{ texts.nope }}", None).unwrap();
        let err = renderer.render_user(&record()).unwrap_err();
        assert!(matches!(err, JobError::Render(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_record_id_is_not_visible() {
        let renderer = PromptRenderer::new("{{ id }}", None).unwrap();
        assert!(matches!(
            renderer.render_user(&record()),
            Err(JobError::Render(_))
        ));
    }

    #[test]
    fn test_no_system_template_is_none() {
        let renderer = PromptRenderer::new("Hi", None).unwrap();
        assert!(!renderer.has_system());
        assert_eq!(renderer.render_system(&record()).unwrap(), None);
    }

    #[test]
    fn test_empty_system_template_is_some_empty() {
        let renderer = PromptRenderer::new("Hi", Some("")).unwrap();
        assert_eq!(renderer.render_system(&record()).unwrap(), Some(String::new()));
    }

    #[test]
    fn test_system_template_sees_texts() {
        let renderer =
            PromptRenderer::new("Hi", Some("Answer in {{ texts.lang }}.")).unwrap();
        assert_eq!(
            renderer.render_system(&record()).unwrap().as_deref(),
            Some("Answer in en.")
        );
    }

    #[test]
    fn test_trailing_newline_preserved() {
        let renderer = PromptRenderer::new("line\n", None).unwrap();
        assert_eq!(renderer.render_user(&record()).unwrap(), "line\n");
    }

    #[test]
    fn test_no_html_escaping() {
        let renderer = PromptRenderer::new("{{ texts.input }}", None).unwrap();
        let rec = InputRecord::new("x").with_text("input", "<b>a & b</b>");
        assert_eq!(renderer.render_user(&rec).unwrap(), "<b>a & b</b>");
    }

    #[test]
    fn test_syntax_error_is_config_error() {
        let err = PromptRenderer::new("{{ texts.input", None).unwrap_err();
        assert!(matches!(err, JobError::Config(_)));
    }
}
