// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job metadata and cancellation flags.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationId, JobId, JobMetadata};

/// Small per-job status record plus a short-lived cancellation flag.
///
/// Status moves from `streaming` to exactly one of `completed`, `error`, or
/// `cancelled` and never changes afterwards. The terminal `mark_*` methods
/// return `false` when the job was already terminal (or unknown), without
/// modifying it.
#[async_trait]
pub trait JobStore: PluginAdapter {
    /// Creates (or resets) the record with status `streaming` and clears any
    /// pending cancellation flag for the id.
    async fn initialize(
        &self,
        job_id: &JobId,
        conversation_id: &ConversationId,
        model: &str,
    ) -> Result<JobMetadata, RelayError>;

    async fn mark_completed(&self, job_id: &JobId) -> Result<bool, RelayError>;

    async fn mark_error(&self, job_id: &JobId, message: &str) -> Result<bool, RelayError>;

    async fn mark_cancelled(&self, job_id: &JobId) -> Result<bool, RelayError>;

    /// Bumps the chunk counter and returns the new count.
    async fn increment_chunk_count(&self, job_id: &JobId) -> Result<u64, RelayError>;

    /// Returns the record, or `None` if it never existed or has expired.
    async fn get(&self, job_id: &JobId) -> Result<Option<JobMetadata>, RelayError>;

    /// Raises the cancellation flag. No-op (returns `false`) unless the job is streaming.
    async fn request_cancellation(&self, job_id: &JobId) -> Result<bool, RelayError>;

    async fn is_cancellation_requested(&self, job_id: &JobId) -> Result<bool, RelayError>;

    /// Removes expired records and flags. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, RelayError> {
        Ok(0)
    }
}
