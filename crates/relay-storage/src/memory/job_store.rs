// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process job metadata and cancellation flags with TTLs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use relay_config::model::JobsConfig;
use relay_core::{
    AdapterType, ConversationId, HealthStatus, JobId, JobMetadata, JobStatus, JobStore,
    PluginAdapter, RelayError,
};

struct Record {
    meta: JobMetadata,
    expires_at: Instant,
}

/// Job records and cancellation flags held in `DashMap`s.
///
/// A record's TTL is refreshed on every write, so it expires `metadata_ttl`
/// after the terminal transition (or after the last chunk if the producer
/// died mid-stream).
pub struct MemoryJobStore {
    jobs: DashMap<JobId, Record>,
    cancellations: DashMap<JobId, Instant>,
    metadata_ttl: Duration,
    cancellation_ttl: Duration,
}

impl MemoryJobStore {
    pub fn new(metadata_ttl: Duration, cancellation_ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            cancellations: DashMap::new(),
            metadata_ttl: super::bounded_ttl(metadata_ttl),
            cancellation_ttl: super::bounded_ttl(cancellation_ttl),
        }
    }

    pub fn from_config(config: &JobsConfig) -> Self {
        Self::new(config.metadata_ttl(), config.cancellation_ttl())
    }

    /// Moves a streaming job to `status`. Returns false if the job is unknown,
    /// expired, or already terminal.
    fn finish(&self, job_id: &JobId, status: JobStatus, error: Option<&str>) -> bool {
        let now = Instant::now();
        let applied = match self.jobs.get_mut(job_id) {
            Some(mut record) if record.expires_at > now && !record.meta.status.is_terminal() => {
                record.meta.status = status;
                record.meta.completed_at = Some(Utc::now());
                record.meta.error = error.map(str::to_string);
                record.expires_at = now + self.metadata_ttl;
                true
            }
            _ => false,
        };
        if applied {
            self.cancellations.remove(job_id);
            debug!(job_id = %job_id, %status, "job reached terminal state");
        }
        applied
    }

    fn live(&self, job_id: &JobId) -> Option<JobMetadata> {
        let now = Instant::now();
        let found = self
            .jobs
            .get(job_id)
            .map(|record| (record.expires_at > now).then(|| record.meta.clone()));
        match found {
            Some(Some(meta)) => Some(meta),
            Some(None) => {
                self.jobs.remove_if(job_id, |_, record| record.expires_at <= now);
                None
            }
            None => None,
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::from_config(&JobsConfig::default())
    }
}

#[async_trait]
impl PluginAdapter for MemoryJobStore {
    fn name(&self) -> &str {
        "memory-job-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::JobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn initialize(
        &self,
        job_id: &JobId,
        conversation_id: &ConversationId,
        model: &str,
    ) -> Result<JobMetadata, RelayError> {
        self.cancellations.remove(job_id);
        let meta = JobMetadata::streaming(job_id.clone(), conversation_id.clone(), model);
        self.jobs.insert(
            job_id.clone(),
            Record {
                meta: meta.clone(),
                expires_at: Instant::now() + self.metadata_ttl,
            },
        );
        Ok(meta)
    }

    async fn mark_completed(&self, job_id: &JobId) -> Result<bool, RelayError> {
        Ok(self.finish(job_id, JobStatus::Completed, None))
    }

    async fn mark_error(&self, job_id: &JobId, message: &str) -> Result<bool, RelayError> {
        Ok(self.finish(job_id, JobStatus::Error, Some(message)))
    }

    async fn mark_cancelled(&self, job_id: &JobId) -> Result<bool, RelayError> {
        Ok(self.finish(job_id, JobStatus::Cancelled, None))
    }

    async fn increment_chunk_count(&self, job_id: &JobId) -> Result<u64, RelayError> {
        let now = Instant::now();
        match self.jobs.get_mut(job_id) {
            Some(mut record) if record.expires_at > now => {
                record.meta.chunk_count += 1;
                record.expires_at = now + self.metadata_ttl;
                Ok(record.meta.chunk_count)
            }
            _ => Err(RelayError::NotFound {
                kind: "job",
                id: job_id.to_string(),
            }),
        }
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<JobMetadata>, RelayError> {
        Ok(self.live(job_id))
    }

    async fn request_cancellation(&self, job_id: &JobId) -> Result<bool, RelayError> {
        match self.live(job_id) {
            Some(meta) if meta.status == JobStatus::Streaming => {
                self.cancellations
                    .insert(job_id.clone(), Instant::now() + self.cancellation_ttl);
                debug!(job_id = %job_id, "cancellation requested");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn is_cancellation_requested(&self, job_id: &JobId) -> Result<bool, RelayError> {
        let now = Instant::now();
        Ok(self
            .cancellations
            .get(job_id)
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn purge_expired(&self) -> Result<usize, RelayError> {
        let now = Instant::now();
        let before = self.jobs.len() + self.cancellations.len();
        self.jobs.retain(|_, record| record.expires_at > now);
        self.cancellations.retain(|_, expires_at| *expires_at > now);
        Ok(before.saturating_sub(self.jobs.len() + self.cancellations.len()))
    }
}
