//! Job definition loading and validation.
//!
//! A job definition is a YAML document naming the prompt templates, the
//! backend, the model and where the answer goes in each output record.
//! [`JobDefinition::load`] validates everything up front so that a bad job
//! fails before the first record is read.
//!
//! ```yaml
//! id: summarize-articles
//! user_template_path: templates/user.j2
//! system_template_path: templates/system.j2
//! backend_endpoint: http://localhost:8080/v1
//! model: qwen3-0.6b
//! output_label: summary
//! use_images: false
//! json_mode: true
//! params:
//!   temperature: 0.2
//! ```

use crate::error::{JobError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};

/// Request fields owned by the request builder; `params` may not set them.
pub const RESERVED_PARAMS: &[&str] = &["model", "messages", "response_format"];

/// Validated, immutable job definition.
///
/// All paths are already resolved against the job file's directory and
/// checked for existence.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    /// Opaque job identifier.
    pub id: String,
    /// Absolute path of the job file this definition was loaded from.
    pub source_path: PathBuf,
    /// Resolved user prompt template.
    pub user_template_path: PathBuf,
    /// Resolved system prompt template, if configured.
    pub system_template_path: Option<PathBuf>,
    /// Backend base URL as written in the job file (not yet normalized).
    pub backend_endpoint: String,
    /// Backend model identifier, sent verbatim.
    pub model: String,
    /// Key under which the answer is written into `texts`.
    pub output_label: String,
    /// Attach record images to the user message.
    pub use_images: bool,
    /// Request unconstrained JSON output.
    pub json_mode: bool,
    /// Resolved schema file, if configured.
    pub json_schema_path: Option<PathBuf>,
    /// Inline schema document, if configured.
    pub json_schema: Option<Value>,
    /// Extra sampling parameters merged into every request.
    pub params: Map<String, Value>,
}

/// Job file as written, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawJob {
    id: Option<Value>,
    #[serde(alias = "erb_filepath")]
    user_template_path: Option<String>,
    #[serde(alias = "system_erb_filepath")]
    system_template_path: Option<String>,
    backend_endpoint: Option<String>,
    model: Option<String>,
    output_label: Option<String>,
    use_images: Option<bool>,
    json_mode: Option<bool>,
    #[serde(alias = "json_schema_filepath")]
    json_schema_path: Option<String>,
    json_schema: Option<Value>,
    #[serde(alias = "extra_params")]
    params: Option<Value>,
}

impl JobDefinition {
    /// Read and validate the job definition at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JobError::Config(format!(
                "Failed to read job definition {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content, path)
    }

    /// Parse and validate a job definition whose file lives at `job_path`.
    ///
    /// `job_path` anchors relative template and schema paths; the file
    /// itself is not read.
    pub fn from_yaml(content: &str, job_path: &Path) -> Result<Self> {
        let raw: RawJob = if content.trim().is_empty() {
            RawJob::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                JobError::Config(format!(
                    "Invalid job definition {}: {}",
                    job_path.display(),
                    e
                ))
            })?
        };

        let source_path = std::path::absolute(job_path).map_err(|e| {
            JobError::Config(format!(
                "Cannot resolve job definition path {}: {}",
                job_path.display(),
                e
            ))
        })?;
        let base_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let RawJob {
            id,
            user_template_path,
            system_template_path,
            backend_endpoint,
            model,
            output_label,
            use_images,
            json_mode,
            json_schema_path,
            json_schema,
            params,
        } = raw;

        let id = match id {
            None | Some(Value::Null) => None,
            Some(value) => Some(scalar_to_string(value).ok_or_else(|| {
                JobError::Config("Configuration key 'id' must be a scalar".to_string())
            })?),
        };

        let mut missing = Vec::new();
        if id.is_none() {
            missing.push("id");
        }
        if user_template_path.is_none() {
            missing.push("user_template_path");
        }
        if backend_endpoint.is_none() {
            missing.push("backend_endpoint");
        }
        if model.is_none() {
            missing.push("model");
        }
        if output_label.is_none() {
            missing.push("output_label");
        }

        let (
            Some(id),
            Some(user_template_path),
            Some(backend_endpoint),
            Some(model),
            Some(output_label),
        ) = (id, user_template_path, backend_endpoint, model, output_label)
        else {
            return Err(JobError::Config(format!(
                "Missing required configuration keys: {}",
                missing.join(", ")
            )));
        };

        let user_template_path = resolve_path(&base_dir, &user_template_path);
        if !user_template_path.exists() {
            return Err(JobError::Config(format!(
                "Template file not found: {}",
                user_template_path.display()
            )));
        }

        let system_template_path = system_template_path
            .map(|raw| resolve_path(&base_dir, &raw))
            .map(|path| {
                if path.exists() {
                    Ok(path)
                } else {
                    Err(JobError::Config(format!(
                        "System template file not found: {}",
                        path.display()
                    )))
                }
            })
            .transpose()?;

        let json_schema_path = json_schema_path
            .map(|raw| resolve_path(&base_dir, &raw))
            .map(|path| {
                if path.exists() {
                    Ok(path)
                } else {
                    Err(JobError::Config(format!(
                        "JSON schema file not found: {}",
                        path.display()
                    )))
                }
            })
            .transpose()?;

        let params = validate_params(params)?;

        Ok(Self {
            id,
            source_path,
            user_template_path,
            system_template_path,
            backend_endpoint,
            model,
            output_label,
            use_images: use_images.unwrap_or(false),
            json_mode: json_mode.unwrap_or(false),
            json_schema_path,
            json_schema,
            params,
        })
    }

    /// Directory containing the job file; relative paths resolve against it.
    pub fn base_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or(Path::new("/"))
    }

    /// Resolve a path the same way template and schema paths are resolved.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        resolve_path(self.base_dir(), raw)
    }
}

/// Resolve `raw` against `base_dir`.
///
/// Absolute paths are returned unchanged. Relative paths are joined onto
/// `base_dir` and normalized lexically (`.` dropped, `..` collapsed)
/// without touching the filesystem.
pub fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    normalize_lexically(&base_dir.join(path))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn validate_params(params: Option<Value>) -> Result<Map<String, Value>> {
    let params = match params {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(JobError::Config(format!(
                "params must be a mapping, got: {}",
                other
            )))
        }
    };

    let reserved: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| RESERVED_PARAMS.contains(k))
        .collect();
    if !reserved.is_empty() {
        return Err(JobError::Config(format!(
            "params may not override reserved request fields: {}",
            reserved.join(", ")
        )));
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn minimal_job(template: &str) -> String {
        format!(
            "id: test-job\n\
             user_template_path: {template}\n\
             backend_endpoint: http://localhost:8080\n\
             model: test-model\n\
             output_label: response\n"
        )
    }

    #[test]
    fn test_resolve_nested_relative_path() {
        let base = Path::new("/data/jobs");
        assert_eq!(
            resolve_path(base, "templates/prompts/user.j2"),
            PathBuf::from("/data/jobs/templates/prompts/user.j2")
        );
    }

    #[test]
    fn test_resolve_parent_reference() {
        let base = Path::new("/data/jobs/sub");
        assert_eq!(
            resolve_path(base, "../parent.j2"),
            PathBuf::from("/data/jobs/parent.j2")
        );
    }

    #[test]
    fn test_resolve_absolute_unchanged() {
        let base = Path::new("/data/jobs");
        assert_eq!(
            resolve_path(base, "/etc/prompts/user.j2"),
            PathBuf::from("/etc/prompts/user.j2")
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let base = Path::new("/data/jobs/sub");
        let once = resolve_path(base, "./a/../b/user.j2");
        assert_eq!(once, PathBuf::from("/data/jobs/sub/b/user.j2"));
        let twice = resolve_path(base, once.to_str().unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_resolve_does_not_climb_above_root() {
        assert_eq!(
            resolve_path(Path::new("/"), "../../x.j2"),
            PathBuf::from("/x.j2")
        );
    }

    #[test]
    fn test_load_minimal_job() {
        let dir = TempDir::new().unwrap();
        let template = write(dir.path(), "templates/user.j2", "Hi {{ texts.input }}");
        let job_path = write(dir.path(), "job.yml", &minimal_job("templates/user.j2"));

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(job.id, "test-job");
        assert_eq!(job.user_template_path, template);
        assert_eq!(job.model, "test-model");
        assert_eq!(job.output_label, "response");
        assert!(!job.use_images);
        assert!(!job.json_mode);
        assert!(job.system_template_path.is_none());
        assert!(job.params.is_empty());
    }

    #[test]
    fn test_missing_keys_are_all_listed() {
        let dir = TempDir::new().unwrap();
        let job_path = write(dir.path(), "job.yml", "id: only-id\nuse_images: true\n");

        let err = JobDefinition::load(&job_path).unwrap_err();
        assert!(matches!(err, JobError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Missing required configuration keys: user_template_path, backend_endpoint, model, output_label"
        );
    }

    #[test]
    fn test_empty_job_file_lists_every_key() {
        let dir = TempDir::new().unwrap();
        let job_path = write(dir.path(), "job.yml", "");
        let err = JobDefinition::load(&job_path).unwrap_err();
        assert!(err
            .to_string()
            .ends_with("id, user_template_path, backend_endpoint, model, output_label"));
    }

    #[test]
    fn test_missing_template_names_resolved_path() {
        let dir = TempDir::new().unwrap();
        let job_path = write(dir.path(), "job.yml", &minimal_job("templates/nonexistent.j2"));

        let err = JobDefinition::load(&job_path).unwrap_err();
        let expected = dir.path().join("templates").join("nonexistent.j2");
        let msg = err.to_string();
        assert!(msg.starts_with("Template file not found"), "{msg}");
        assert!(msg.contains(expected.to_str().unwrap()), "{msg}");
    }

    #[test]
    fn test_missing_system_template_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/user.j2", "Hi");
        let yaml = format!(
            "{}system_template_path: templates/system.j2\n",
            minimal_job("templates/user.j2")
        );
        let job_path = write(dir.path(), "job.yml", &yaml);

        let err = JobDefinition::load(&job_path).unwrap_err();
        assert!(err.to_string().starts_with("System template file not found"));
    }

    #[test]
    fn test_missing_schema_file_names_resolved_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/user.j2", "Hi");
        let yaml = format!(
            "{}json_schema_filepath: schemas/nonexistent.yml\n",
            minimal_job("templates/user.j2")
        );
        let job_path = write(dir.path(), "job.yml", &yaml);

        let err = JobDefinition::load(&job_path).unwrap_err();
        let expected = dir.path().join("schemas").join("nonexistent.yml");
        assert!(err.to_string().starts_with("JSON schema file not found"));
        assert!(err.to_string().contains(expected.to_str().unwrap()));
    }

    #[test]
    fn test_non_scalar_id_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/user.j2", "Hi");
        let yaml = "id:\n  nested: true\n\
                    user_template_path: templates/user.j2\n\
                    backend_endpoint: http://localhost:8080\n\
                    model: m\n\
                    output_label: out\n";
        let job_path = write(dir.path(), "job.yml", yaml);

        let err = JobDefinition::load(&job_path).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Configuration key 'id' must be a scalar");
    }

    #[test]
    fn test_legacy_key_aliases() {
        let dir = TempDir::new().unwrap();
        let user = write(dir.path(), "templates/user.j2", "Hi");
        let system = write(dir.path(), "templates/system.j2", "Be brief");
        let yaml = "id: legacy\n\
                    erb_filepath: templates/user.j2\n\
                    system_erb_filepath: templates/system.j2\n\
                    backend_endpoint: http://localhost:8080/v1\n\
                    model: m\n\
                    output_label: out\n";
        let job_path = write(dir.path(), "job.yml", yaml);

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(job.user_template_path, user);
        assert_eq!(job.system_template_path, Some(system));
    }

    #[test]
    fn test_parent_relative_template_from_subdir() {
        let dir = TempDir::new().unwrap();
        let parent = write(dir.path(), "parent_prompt.j2", "Parent");
        let job_path = write(dir.path(), "sub/job.yml", &minimal_job("../parent_prompt.j2"));

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(job.user_template_path, parent);
        assert_eq!(job.resolve("../parent_prompt.j2"), parent);
    }

    #[test]
    fn test_absolute_template_path() {
        let dir = TempDir::new().unwrap();
        let template = write(dir.path(), "abs/user.j2", "Hi");
        let job_path = write(
            dir.path(),
            "jobs/job.yml",
            &minimal_job(template.to_str().unwrap()),
        );

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(job.user_template_path, template);
    }

    #[test]
    fn test_params_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.j2", "Hi");
        let yaml = format!(
            "{}params:\n  temperature: 0.2\n  max_tokens: 64\nnot_a_known_key: whatever\n",
            minimal_job("user.j2")
        );
        let job_path = write(dir.path(), "job.yml", &yaml);

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(job.params.get("temperature"), Some(&json!(0.2)));
        assert_eq!(job.params.get("max_tokens"), Some(&json!(64)));
    }

    #[test]
    fn test_params_reserved_key_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.j2", "Hi");
        let yaml = format!("{}params:\n  model: other\n", minimal_job("user.j2"));
        let job_path = write(dir.path(), "job.yml", &yaml);

        let err = JobDefinition::load(&job_path).unwrap_err();
        assert!(err.to_string().contains("reserved request fields: model"));
    }

    #[test]
    fn test_inline_schema_is_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.j2", "Hi");
        let yaml = format!(
            "{}json_schema:\n  type: object\n  required: [name]\n",
            minimal_job("user.j2")
        );
        let job_path = write(dir.path(), "job.yml", &yaml);

        let job = JobDefinition::load(&job_path).unwrap();
        assert_eq!(
            job.json_schema,
            Some(json!({"type": "object", "required": ["name"]}))
        );
    }

    #[test]
    fn test_unreadable_job_file() {
        let err = JobDefinition::load("/definitely/not/here/job.yml").unwrap_err();
        assert!(matches!(err, JobError::Config(_)));
        assert!(err.to_string().contains("/definitely/not/here/job.yml"));
    }
}
