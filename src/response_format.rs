//! Response-format negotiation.
//!
//! A job asks the backend for plain text, unconstrained JSON, or JSON
//! constrained by a schema. [`ResponseFormat::resolve`] picks exactly one,
//! first match wins:
//!
//! 1. inline `json_schema`
//! 2. `json_schema_path` (YAML or JSON file)
//! 3. `json_mode: true`
//! 4. nothing

use crate::config::JobDefinition;
use crate::error::{JobError, Result};
use serde_json::{json, Value};
use std::path::Path;

/// The negotiated constraint on backend output shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// No directive; the request carries no `response_format` key.
    #[default]
    None,
    /// `{"type": "json_object"}`
    PlainJson,
    /// `{"type": "json_object", "schema": ...}`
    SchemaJson(Value),
}

impl ResponseFormat {
    /// Resolve the format for a job. Done once per job.
    pub fn resolve(job: &JobDefinition) -> Result<Self> {
        if let Some(ref schema) = job.json_schema {
            return Ok(Self::SchemaJson(schema.clone()));
        }
        if let Some(ref path) = job.json_schema_path {
            return load_schema(path).map(Self::SchemaJson);
        }
        if job.json_mode {
            return Ok(Self::PlainJson);
        }
        Ok(Self::None)
    }

    /// The `response_format` value to send, or `None` to omit the field.
    pub fn directive(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::PlainJson => Some(json!({"type": "json_object"})),
            Self::SchemaJson(schema) => Some(json!({"type": "json_object", "schema": schema})),
        }
    }

    pub fn is_json(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Read a schema document. YAML is accepted, which covers JSON too.
pub fn load_schema(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| JobError::SchemaLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str::<Value>(&content).map_err(|e| JobError::SchemaLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
