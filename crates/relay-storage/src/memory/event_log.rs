// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process event log with a per-job size cap and retention window.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use relay_config::model::EventLogConfig;
use relay_core::{
    AdapterType, EntryId, EventLog, HealthStatus, JobId, LogEntry, NewEntry, PluginAdapter,
    RelayError,
};

struct JobLog {
    entries: VecDeque<LogEntry>,
    last_id: EntryId,
    expires_at: Instant,
}

impl JobLog {
    fn new(expires_at: Instant) -> Self {
        Self {
            entries: VecDeque::new(),
            last_id: EntryId::ZERO,
            expires_at,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Event log held in a `DashMap` keyed by job id.
///
/// Every append refreshes the job's retention window, so a finished job's log
/// lives for `ttl` past its terminal entry. Entries beyond `max_entries` are
/// dropped oldest first.
pub struct MemoryEventLog {
    logs: DashMap<JobId, JobLog>,
    max_entries: usize,
    ttl: Duration,
}

impl MemoryEventLog {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            logs: DashMap::new(),
            max_entries: max_entries.max(1),
            ttl: super::bounded_ttl(ttl),
        }
    }

    pub fn from_config(config: &EventLogConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Number of jobs with a retained log (expired ones included until purged).
    pub fn job_count(&self) -> usize {
        self.logs.len()
    }

    /// Drops the job's log if it has expired. Returns true if the log is live.
    fn evict_if_expired(&self, job_id: &JobId) -> bool {
        let now = Instant::now();
        let expired = match self.logs.get(job_id) {
            Some(log) => log.is_expired(now),
            None => return false,
        };
        if expired {
            self.logs.remove_if(job_id, |_, log| log.is_expired(now));
            debug!(job_id = %job_id, "event log expired");
        }
        !expired
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::from_config(&EventLogConfig::default())
    }
}

#[async_trait]
impl PluginAdapter for MemoryEventLog {
    fn name(&self) -> &str {
        "memory-event-log"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::EventLog
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, job_id: &JobId, entry: NewEntry) -> Result<EntryId, RelayError> {
        let now = Instant::now();
        let timestamp = Utc::now().timestamp_millis();

        let mut log = self
            .logs
            .entry(job_id.clone())
            .or_insert_with(|| JobLog::new(now + self.ttl));
        if log.is_expired(now) {
            *log = JobLog::new(now + self.ttl);
        }

        let id = log.last_id.successor(timestamp.max(0) as u64);
        log.last_id = id;
        log.entries.push_back(entry.into_entry(id, timestamp));
        while log.entries.len() > self.max_entries {
            log.entries.pop_front();
        }
        log.expires_at = now + self.ttl;

        Ok(id)
    }

    async fn read_from(
        &self,
        job_id: &JobId,
        cursor: &EntryId,
        max_count: usize,
    ) -> Result<Vec<LogEntry>, RelayError> {
        if !self.evict_if_expired(job_id) {
            return Ok(Vec::new());
        }
        let Some(log) = self.logs.get(job_id) else {
            return Ok(Vec::new());
        };

        let start = log.entries.partition_point(|e| e.id <= *cursor);
        Ok(log
            .entries
            .range(start..)
            .take(max_count)
            .cloned()
            .collect())
    }

    async fn read_all(&self, job_id: &JobId) -> Result<Vec<LogEntry>, RelayError> {
        if !self.evict_if_expired(job_id) {
            return Ok(Vec::new());
        }
        Ok(self
            .logs
            .get(job_id)
            .map(|log| log.entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, job_id: &JobId) -> Result<(), RelayError> {
        self.logs.remove(job_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, RelayError> {
        let now = Instant::now();
        let before = self.logs.len();
        self.logs.retain(|_, log| !log.is_expired(now));
        Ok(before.saturating_sub(self.logs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::EntryKind;

    fn job(id: &str) -> JobId {
        JobId::from(id)
    }

    #[tokio::test]
    async fn ids_are_strictly_increasing() {
        let log = MemoryEventLog::default();
        let mut previous = EntryId::ZERO;
        for i in 0..50 {
            let id = log.append(&job("j"), NewEntry::chunk(format!("{i}"))).await.unwrap();
            assert!(id > previous, "{id} should follow {previous}");
            previous = id;
        }
        let all = log.read_all(&job("j")).await.unwrap();
        assert_eq!(all.len(), 50);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn read_from_returns_entries_strictly_after_cursor() {
        let log = MemoryEventLog::default();
        let first = log.append(&job("j"), NewEntry::chunk("a")).await.unwrap();
        log.append(&job("j"), NewEntry::chunk("b")).await.unwrap();
        log.append(&job("j"), NewEntry::chunk("c")).await.unwrap();

        let after_first = log.read_from(&job("j"), &first, 10).await.unwrap();
        let texts: Vec<_> = after_first.iter().filter_map(|e| e.data.as_deref()).collect();
        assert_eq!(texts, ["b", "c"]);

        let limited = log.read_from(&job("j"), &EntryId::ZERO, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].data.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn repeated_reads_at_head_are_empty() {
        let log = MemoryEventLog::default();
        let last = log.append(&job("j"), NewEntry::chunk("a")).await.unwrap();
        for _ in 0..3 {
            assert!(log.read_from(&job("j"), &last, 100).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_job_reads_empty() {
        let log = MemoryEventLog::default();
        assert!(log.read_all(&job("missing")).await.unwrap().is_empty());
        assert!(log
            .read_from(&job("missing"), &EntryId::ZERO, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn jobs_are_isolated() {
        let log = MemoryEventLog::default();
        log.append(&job("a"), NewEntry::chunk("x")).await.unwrap();
        log.append(&job("b"), NewEntry::chunk("y")).await.unwrap();
        let a = log.read_all(&job("a")).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].data.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn size_cap_drops_oldest_entries() {
        let log = MemoryEventLog::new(3, Duration::from_secs(60));
        for i in 0..5 {
            log.append(&job("j"), NewEntry::chunk(format!("{i}"))).await.unwrap();
        }
        let all = log.read_all(&job("j")).await.unwrap();
        let texts: Vec<_> = all.iter().filter_map(|e| e.data.as_deref()).collect();
        assert_eq!(texts, ["2", "3", "4"]);
    }

    #[tokio::test]
    async fn clear_drops_history_and_ids_keep_growing() {
        let log = MemoryEventLog::default();
        let before = log.append(&job("j"), NewEntry::chunk("old")).await.unwrap();
        log.clear(&job("j")).await.unwrap();
        assert!(log.read_all(&job("j")).await.unwrap().is_empty());

        let after = log.append(&job("j"), NewEntry::complete()).await.unwrap();
        assert!(after >= before);
        let all = log.read_all(&job("j")).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].kind, EntryKind::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn log_expires_after_ttl_since_last_append() {
        let log = MemoryEventLog::new(100, Duration::from_secs(10));
        log.append(&job("j"), NewEntry::chunk("a")).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        log.append(&job("j"), NewEntry::complete()).await.unwrap();

        // Retention is measured from the terminal append, not the first one.
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(log.read_all(&job("j")).await.unwrap().len(), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(log.read_all(&job("j")).await.unwrap().is_empty());
        assert_eq!(log.job_count(), 0);
    }

    #[tokio::test]
    async fn oversized_ttl_is_capped() {
        let log = MemoryEventLog::new(10, Duration::MAX);
        log.append(&job("j"), NewEntry::chunk("a")).await.unwrap();
        assert_eq!(log.read_all(&job("j")).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired_logs() {
        let log = MemoryEventLog::new(100, Duration::from_secs(10));
        log.append(&job("old"), NewEntry::complete()).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        log.append(&job("fresh"), NewEntry::chunk("a")).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(log.purge_expired().await.unwrap(), 1);
        assert_eq!(log.job_count(), 1);
        assert_eq!(log.read_all(&job("fresh")).await.unwrap().len(), 1);
    }
}
