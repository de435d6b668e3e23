//! # LLM Job
//!
//! Batch record transformation through an OpenAI-compatible chat backend.
//!
//! A job is a small YAML file naming a prompt template, a model, an endpoint
//! and the label under which each answer is stored. Records arrive as JSON
//! Lines, each with an opaque `id`, a map of labeled `texts` and optional
//! base64 `images`. For every record the job renders the prompt, calls the
//! backend, strips `<think>` reasoning from the reply and writes the record
//! back out with the answer merged into `texts`.
//!
//! ## Core Concepts
//!
//! - **[`JobDefinition`]**: the validated job file with every path resolved
//!   against the job file's own directory.
//! - **[`Job`]**: a loaded job (definition, compiled templates, resolved
//!   [`ResponseFormat`]) that processes records.
//! - **[`ExecCtx`]**: the HTTP client, backend and normalized endpoint shared
//!   by every record of a run.
//! - **[`Backend`](backend::Backend)**: the chat completion seam.
//!   [`OpenAiBackend`] talks HTTP; [`MockBackend`] replays canned replies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_job::Job;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = Job::load("jobs/summarize.yml")?;
//!     let ctx = job.exec_ctx_builder().openai_from_env().build()?;
//!
//!     let summary = job
//!         .run(
//!             &ctx,
//!             BufReader::new(tokio::io::stdin()),
//!             tokio::io::stdout(),
//!             tokio::io::stderr(),
//!         )
//!         .await?;
//!     eprintln!("{} processed, {} failed", summary.processed, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a server
//!
//! ```
//! use llm_job::{ExecCtx, MockBackend};
//! use std::sync::Arc;
//!
//! let ctx = ExecCtx::builder("http://unused")
//!     .backend(Arc::new(MockBackend::fixed("Mocked response from API")))
//!     .build()
//!     .unwrap();
//! assert_eq!(ctx.backend.name(), "mock");
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod parsing;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod response_format;
pub mod types;

pub use backend::{Backend, MockBackend, MockReply, OpenAiBackend};
pub use config::JobDefinition;
pub use error::{JobError, Result};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use parsing::{clean_content, extract_thinking};
pub use pipeline::Job;
pub use prompt::PromptRenderer;
pub use request::build_request;
pub use response_format::ResponseFormat;
pub use types::{InputRecord, OutputRecord, RunSummary};
