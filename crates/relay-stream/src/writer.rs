// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The producer loop for one generation job.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_config::model::JobsConfig;
use relay_core::types::{
    ConversationMessage, GenerationEvent, GenerationOutcome, GenerationRequest,
};
use relay_core::{
    ConversationId, EventLog, GenerationProvider, JobId, JobStatus, JobStore, NewEntry,
    RelayError,
};

use crate::handoff::PersistenceHandoff;

/// Everything the producer needs to run one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub job_id: JobId,
    pub conversation_id: ConversationId,
    pub model: String,
    /// Full prior message list, ending with the user message that triggered the job.
    pub history: Vec<ConversationMessage>,
}

/// Summary of a finished job, returned to whoever awaited the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub text: String,
    pub chunk_count: u64,
}

/// Text accumulated so far.
#[derive(Default)]
struct Progress {
    text: String,
    chunks: u64,
}

enum Ending {
    Finished(GenerationOutcome),
    Cancelled,
    Failed(RelayError),
}

/// Drives a generation job and records it in the event log and job store.
///
/// Log and counter writes for individual chunks are best-effort: a failure is
/// logged and the job continues, because the accumulated text is still handed
/// to the conversation store at the end.
#[derive(Clone)]
pub struct StreamWriter {
    log: Arc<dyn EventLog>,
    jobs: Arc<dyn JobStore>,
    handoff: PersistenceHandoff,
    cancel_poll_interval: Duration,
}

impl StreamWriter {
    pub fn new(
        log: Arc<dyn EventLog>,
        jobs: Arc<dyn JobStore>,
        handoff: PersistenceHandoff,
        config: &JobsConfig,
    ) -> Self {
        Self {
            log,
            jobs,
            handoff,
            cancel_poll_interval: config.cancel_poll_interval(),
        }
    }

    /// Run the job to completion with a fresh abort signal.
    pub async fn run(
        &self,
        spec: JobSpec,
        provider: Arc<dyn GenerationProvider>,
    ) -> Result<JobReport, RelayError> {
        self.run_with_abort(spec, provider, CancellationToken::new())
            .await
    }

    /// Run the job, stopping early if `abort` is cancelled or a cancellation
    /// request is observed in the job store.
    ///
    /// Only a failure to initialize the job metadata is returned as `Err`.
    pub async fn run_with_abort(
        &self,
        spec: JobSpec,
        provider: Arc<dyn GenerationProvider>,
        abort: CancellationToken,
    ) -> Result<JobReport, RelayError> {
        self.prepare(&spec).await?;
        Ok(self.run_prepared(spec, provider, abort).await)
    }

    /// Initialize the job metadata as streaming and clear any log left by an
    /// earlier job with the same id. After this returns the job is visible to
    /// status and subscribe requests.
    pub async fn prepare(&self, spec: &JobSpec) -> Result<(), RelayError> {
        self.jobs
            .initialize(&spec.job_id, &spec.conversation_id, &spec.model)
            .await?;
        if let Err(e) = self.log.clear(&spec.job_id).await {
            warn!(job_id = %spec.job_id, error = %e, "failed to clear stale event log");
        }
        info!(
            job_id = %spec.job_id,
            conversation_id = %spec.conversation_id,
            model = %spec.model,
            "generation job started"
        );
        Ok(())
    }

    /// Drive a job already set up by [`StreamWriter::prepare`].
    ///
    /// Every outcome, including provider failures, ends in exactly one
    /// terminal log entry and a terminal status.
    pub async fn run_prepared(
        &self,
        spec: JobSpec,
        provider: Arc<dyn GenerationProvider>,
        abort: CancellationToken,
    ) -> JobReport {
        let started = Instant::now();
        let poller = self.spawn_cancel_poller(spec.job_id.clone(), abort.clone());
        let (progress, ending) = self.consume(&spec, provider.as_ref(), &abort).await;
        poller.abort();

        let elapsed = started.elapsed();
        let status = match ending {
            Ending::Finished(outcome) => {
                self.finish_completed(&spec, &progress, outcome, elapsed)
                    .await
            }
            Ending::Cancelled => self.finish_cancelled(&spec, &progress, elapsed).await,
            Ending::Failed(error) => self.finish_failed(&spec, &error).await,
        };

        info!(
            job_id = %spec.job_id,
            %status,
            chunks = progress.chunks,
            duration_ms = elapsed.as_millis() as u64,
            "generation job finished"
        );
        JobReport {
            job_id: spec.job_id,
            status,
            text: progress.text,
            chunk_count: progress.chunks,
        }
    }

    /// Poll the job store for a cancellation request and raise `abort` when one
    /// is seen. The task exits once `abort` is cancelled.
    fn spawn_cancel_poller(&self, job_id: JobId, abort: CancellationToken) -> JoinHandle<()> {
        let jobs = Arc::clone(&self.jobs);
        let period = self.cancel_poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = abort.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                match jobs.is_cancellation_requested(&job_id).await {
                    Ok(true) => {
                        info!(job_id = %job_id, "cancellation request observed");
                        abort.cancel();
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => warn!(job_id = %job_id, error = %e, "cancellation poll failed"),
                }
            }
        })
    }

    async fn consume(
        &self,
        spec: &JobSpec,
        provider: &dyn GenerationProvider,
        abort: &CancellationToken,
    ) -> (Progress, Ending) {
        let mut progress = Progress::default();
        let request = GenerationRequest {
            conversation_id: spec.conversation_id.clone(),
            model: spec.model.clone(),
            messages: spec.history.clone(),
        };

        let mut stream = match provider.generate(request, abort.clone()).await {
            Ok(stream) => stream,
            Err(e) => return (progress, classify(e, abort)),
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = abort.cancelled() => return (progress, Ending::Cancelled),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(GenerationEvent::Fragment(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    self.record_chunk(&spec.job_id, &text).await;
                    progress.text.push_str(&text);
                    progress.chunks += 1;
                }
                Some(Ok(GenerationEvent::Finished(outcome))) => {
                    return (progress, Ending::Finished(outcome));
                }
                Some(Err(e)) => return (progress, classify(e, abort)),
                None => break,
            }
        }

        if abort.is_cancelled() {
            (progress, Ending::Cancelled)
        } else {
            (progress, Ending::Finished(GenerationOutcome::default()))
        }
    }

    async fn record_chunk(&self, job_id: &JobId, text: &str) {
        if let Err(e) = self.log.append(job_id, NewEntry::chunk(text)).await {
            warn!(job_id = %job_id, error = %e, "failed to append chunk");
        }
        if let Err(e) = self.jobs.increment_chunk_count(job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to increment chunk count");
        }
    }

    async fn append_best_effort(&self, job_id: &JobId, entry: NewEntry) {
        let kind = entry.kind;
        if let Err(e) = self.log.append(job_id, entry).await {
            warn!(job_id = %job_id, %kind, error = %e, "failed to append log entry");
        }
    }

    async fn finish_completed(
        &self,
        spec: &JobSpec,
        progress: &Progress,
        outcome: GenerationOutcome,
        elapsed: Duration,
    ) -> JobStatus {
        let job_id = &spec.job_id;
        let summary = json!({
            "model": spec.model,
            "usage": outcome.usage,
            "chunkCount": progress.chunks,
            "durationMs": elapsed.as_millis() as u64,
        });
        self.append_best_effort(job_id, NewEntry::metadata(summary))
            .await;
        if !outcome.sources.is_empty() {
            self.append_best_effort(job_id, NewEntry::sources(outcome.sources.clone()))
                .await;
        }
        self.append_best_effort(job_id, NewEntry::complete()).await;

        match self.jobs.mark_completed(job_id).await {
            Ok(true) => {}
            Ok(false) => debug!(job_id = %job_id, "job was already terminal"),
            Err(e) => warn!(job_id = %job_id, error = %e, "failed to mark job completed"),
        }

        let message = PersistenceHandoff::build_message(
            job_id,
            &spec.model,
            progress.text.clone(),
            &outcome,
            elapsed,
            false,
        );
        self.persist(spec, message).await;
        JobStatus::Completed
    }

    async fn finish_cancelled(
        &self,
        spec: &JobSpec,
        progress: &Progress,
        elapsed: Duration,
    ) -> JobStatus {
        let job_id = &spec.job_id;
        if !progress.text.is_empty() {
            let message = PersistenceHandoff::build_message(
                job_id,
                &spec.model,
                progress.text.clone(),
                &GenerationOutcome::default(),
                elapsed,
                true,
            );
            self.persist(spec, message).await;
        }

        self.append_best_effort(job_id, NewEntry::complete_with(json!({ "cancelled": true })))
            .await;
        if let Err(e) = self.jobs.mark_cancelled(job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to mark job cancelled");
        }
        JobStatus::Cancelled
    }

    async fn finish_failed(&self, spec: &JobSpec, error: &RelayError) -> JobStatus {
        let job_id = &spec.job_id;
        let message = error.to_string();
        warn!(job_id = %job_id, error = %message, "generation failed");

        self.append_best_effort(job_id, NewEntry::error(message.clone()))
            .await;
        if let Err(e) = self.jobs.mark_error(job_id, &message).await {
            warn!(job_id = %job_id, error = %e, "failed to mark job errored");
        }
        JobStatus::Error
    }

    async fn persist(&self, spec: &JobSpec, message: ConversationMessage) {
        if let Err(e) = self
            .handoff
            .persist(&spec.conversation_id, &spec.history, message)
            .await
        {
            // The log still holds the reply until it expires.
            warn!(
                job_id = %spec.job_id,
                conversation_id = %spec.conversation_id,
                error = %e,
                "failed to persist assistant reply"
            );
        }
    }
}

fn classify(error: RelayError, abort: &CancellationToken) -> Ending {
    if error.is_cancelled() || abort.is_cancelled() {
        Ending::Cancelled
    } else {
        Ending::Failed(error)
    }
}
