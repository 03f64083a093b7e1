// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only per-job event log.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EntryId, JobId, LogEntry, NewEntry};

/// Ordered, append-only storage of a job's log entries.
///
/// Only the job's producer appends; any number of readers may hold their own
/// cursor. Reads never consume entries. Implementations may trim the oldest
/// entries beyond a size cap and expire a job's log after a retention window,
/// after which reads return empty.
#[async_trait]
pub trait EventLog: PluginAdapter {
    /// Appends an entry and returns the id the log assigned to it.
    ///
    /// Ids are strictly increasing per job.
    async fn append(&self, job_id: &JobId, entry: NewEntry) -> Result<EntryId, RelayError>;

    /// Returns up to `max_count` entries with ids strictly greater than `cursor`.
    ///
    /// Never blocks; an empty vector means nothing new has been appended yet.
    async fn read_from(
        &self,
        job_id: &JobId,
        cursor: &EntryId,
        max_count: usize,
    ) -> Result<Vec<LogEntry>, RelayError>;

    /// Returns the full retained history in append order.
    async fn read_all(&self, job_id: &JobId) -> Result<Vec<LogEntry>, RelayError>;

    /// Drops every entry of the job.
    async fn clear(&self, job_id: &JobId) -> Result<(), RelayError>;

    /// Removes logs whose retention window has passed. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, RelayError> {
        Ok(0)
    }
}
