use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading a job or transforming records.
///
/// Configuration-time variants ([`Config`](JobError::Config),
/// [`SchemaLoad`](JobError::SchemaLoad)) abort the run before any record is
/// read. Record-time variants are reported per line and the run continues.
#[derive(Error, Debug)]
pub enum JobError {
    /// Invalid or incomplete job definition (missing keys, missing files).
    #[error("{0}")]
    Config(String),

    /// A declared JSON schema file could not be read or parsed.
    #[error("Failed to load JSON schema from {}: {message}", path.display())]
    SchemaLoad {
        /// Resolved path of the schema file.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },

    /// An input line is not a well-formed record.
    #[error("Error parsing JSON line: {0}")]
    Parse(#[from] serde_json::Error),

    /// Template evaluation failed against a record's fields.
    #[error("Template rendering failed: {0}")]
    Render(String),

    /// The backend call failed transport-side or returned an unusable body.
    #[error("API request failed: {0}")]
    Backend(String),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Returns `true` for errors that must terminate the run.
    ///
    /// Stream I/O failures are fatal too: without stdin/stdout there is
    /// nothing left to process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobError::Config(_) | JobError::SchemaLoad { .. } | JobError::Io(_)
        )
    }
}

impl From<minijinja::Error> for JobError {
    fn from(err: minijinja::Error) -> Self {
        JobError::Render(err.to_string())
    }
}

impl From<reqwest::Error> for JobError {
    fn from(err: reqwest::Error) -> Self {
        JobError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
