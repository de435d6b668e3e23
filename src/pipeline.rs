//! The record pipeline.
//!
//! A [`Job`] bundles everything fixed for a run: the validated definition,
//! the compiled templates and the resolved response format. It transforms
//! one record at a time with [`Job::process_record`] and drives a whole
//! JSONL stream with [`Job::run`].
//!
//! Per record: render user → render system → build request → backend →
//! clean → merge under the output label. Any failure skips that record
//! only.

use crate::{
    config::JobDefinition,
    error::{JobError, Result},
    events::{emit, Event},
    exec_ctx::{ExecCtx, ExecCtxBuilder},
    parsing,
    prompt::PromptRenderer,
    request::build_request,
    response_format::ResponseFormat,
    types::{InputRecord, OutputRecord, RunSummary},
};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// A loaded job, immutable for the lifetime of a run.
pub struct Job {
    definition: JobDefinition,
    renderer: PromptRenderer,
    response_format: ResponseFormat,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.definition.id)
            .field("model", &self.definition.model)
            .field("output_label", &self.definition.output_label)
            .field("response_format", &self.response_format)
            .field("has_system", &self.renderer.has_system())
            .finish()
    }
}

impl Job {
    /// Load, validate and compile the job at `path`.
    ///
    /// Every configuration problem surfaces here, before any record is read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_definition(JobDefinition::load(path)?)
    }

    /// Compile templates and resolve the response format for a definition.
    pub fn from_definition(definition: JobDefinition) -> Result<Self> {
        let renderer = PromptRenderer::from_job(&definition)?;
        let response_format = ResponseFormat::resolve(&definition)?;
        info!(
            job = %definition.id,
            model = %definition.model,
            json = response_format.is_json(),
            "job loaded"
        );
        Ok(Self {
            definition,
            renderer,
            response_format,
        })
    }

    pub fn definition(&self) -> &JobDefinition {
        &self.definition
    }

    pub fn response_format(&self) -> &ResponseFormat {
        &self.response_format
    }

    /// An [`ExecCtx`] builder pointed at this job's backend endpoint.
    pub fn exec_ctx_builder(&self) -> ExecCtxBuilder {
        ExecCtx::builder(self.definition.backend_endpoint.as_str())
    }

    /// Transform a single record.
    ///
    /// Nothing is emitted on failure; the caller decides whether to skip.
    pub async fn process_record(&self, ctx: &ExecCtx, record: InputRecord) -> Result<OutputRecord> {
        let user_prompt = self.renderer.render_user(&record)?;
        let system_prompt = self.renderer.render_system(&record)?;

        let request = build_request(
            &self.definition,
            &record,
            user_prompt,
            system_prompt,
            &self.response_format,
        );

        let response = ctx
            .backend
            .complete(&ctx.client, &ctx.base_url, &request)
            .await?;
        debug!(
            backend = ctx.backend.name(),
            status = response.status,
            chars = response.text.len(),
            "backend responded"
        );
        if let Some(ref metadata) = response.metadata {
            debug!(
                model = ?metadata.get("model"),
                usage = ?metadata.get("usage"),
                "response metadata"
            );
        }

        let (thinking, answer) = parsing::extract_thinking(&response.text);
        if let Some(thinking) = thinking {
            debug!(chars = thinking.len(), "stripped reasoning from response");
        }

        Ok(OutputRecord::merge(
            record,
            &self.definition.output_label,
            answer,
        ))
    }

    /// Process a JSONL stream, one record at a time, in input order.
    ///
    /// Each successful record is written to `output` as one JSON line and
    /// flushed before the next line is read. Unparseable lines and failed
    /// records are reported on `diagnostics` and skipped. Only I/O failures
    /// on the streams end the run early.
    pub async fn run<R, W, D>(
        &self,
        ctx: &ExecCtx,
        mut input: R,
        mut output: W,
        mut diagnostics: D,
    ) -> Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        D: AsyncWrite + Unpin,
    {
        let mut summary = RunSummary::default();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        info!(job = %self.definition.id, backend = ctx.backend.name(), "run started");

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let record: InputRecord = match serde_json::from_slice(line) {
                Ok(record) => record,
                Err(e) => {
                    let err = JobError::Parse(e);
                    debug!(line = line_no, error = %err, "skipping line");
                    report(&mut diagnostics, &err.to_string()).await?;
                    emit(
                        &ctx.event_handler,
                        Event::LineSkipped {
                            line: line_no,
                            reason: err.to_string(),
                        },
                    );
                    summary.skipped_lines += 1;
                    continue;
                }
            };

            let id = record.id.clone();
            debug!(line = line_no, id = %id, "processing record");
            emit(
                &ctx.event_handler,
                Event::RecordStart {
                    line: line_no,
                    id: id.clone(),
                },
            );

            let ok = match self.process_record(ctx, record).await {
                Ok(out) => {
                    let mut encoded = serde_json::to_string(&out)?;
                    encoded.push('\n');
                    output.write_all(encoded.as_bytes()).await?;
                    output.flush().await?;
                    summary.processed += 1;
                    true
                }
                Err(e) => {
                    debug!(line = line_no, id = %id, error = %e, "record failed");
                    report(&mut diagnostics, &format!("Error processing item: {}", e)).await?;
                    summary.failed += 1;
                    false
                }
            };

            emit(
                &ctx.event_handler,
                Event::RecordEnd {
                    line: line_no,
                    id,
                    ok,
                },
            );
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            skipped_lines = summary.skipped_lines,
            "run finished"
        );
        Ok(summary)
    }
}

async fn report<D: AsyncWrite + Unpin>(diagnostics: &mut D, message: &str) -> Result<()> {
    diagnostics.write_all(message.as_bytes()).await?;
    diagnostics.write_all(b"\n").await?;
    diagnostics.flush().await?;
    Ok(())
}
