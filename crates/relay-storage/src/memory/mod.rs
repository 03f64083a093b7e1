// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process stores for the event log and job metadata.
//!
//! These hold per-job state for the lifetime of the process, with the same
//! TTL semantics a networked key-value store would apply. Expired keys are
//! evicted lazily on read and in bulk by `purge_expired`.

pub mod event_log;
pub mod job_store;

pub use event_log::MemoryEventLog;
pub use job_store::MemoryJobStore;

use std::time::Duration;

use relay_config::validation::MAX_TTL_SECS;

/// Caps a retention window so `Instant + ttl` cannot overflow.
pub(crate) fn bounded_ttl(ttl: Duration) -> Duration {
    ttl.min(Duration::from_secs(MAX_TTL_SECS))
}
