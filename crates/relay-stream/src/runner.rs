// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background execution of producer jobs.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{GenerationProvider, JobId, RelayError};

use crate::writer::{JobSpec, StreamWriter};

enum Slot {
    /// Reserved while the job metadata is being initialized.
    Starting,
    Running(JoinHandle<()>),
}

impl Slot {
    fn is_finished(&self) -> bool {
        match self {
            Slot::Starting => false,
            Slot::Running(handle) => handle.is_finished(),
        }
    }
}

/// Spawns one [`StreamWriter`] task per job and tracks the running ones.
///
/// A job id can only be started again once its previous task has finished.
pub struct JobRunner {
    writer: StreamWriter,
    provider: Arc<dyn GenerationProvider>,
    active: DashMap<JobId, Slot>,
    shutdown: CancellationToken,
}

impl JobRunner {
    pub fn new(writer: StreamWriter, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            writer,
            provider,
            active: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Initialize `spec` and run it in the background.
    ///
    /// When this returns `Ok` the job metadata exists with status streaming,
    /// so a subscriber may attach right away. Fails with `Conflict` if a job
    /// with the same id is still running, and with `Cancelled` once
    /// [`JobRunner::shutdown`] has been called.
    pub async fn start(&self, spec: JobSpec) -> Result<JobId, RelayError> {
        if self.shutdown.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        self.active.retain(|_, slot| !slot.is_finished());

        let job_id = spec.job_id.clone();
        match self.active.entry(job_id.clone()) {
            Entry::Occupied(_) => {
                return Err(RelayError::Conflict(format!(
                    "job {job_id} is already running"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Starting);
            }
        }

        if let Err(e) = self.writer.prepare(&spec).await {
            self.active.remove(&job_id);
            return Err(e);
        }

        let handle = self.spawn(spec);
        self.active.insert(job_id.clone(), Slot::Running(handle));
        debug!(job_id = %job_id, "producer task spawned");
        Ok(job_id)
    }

    fn spawn(&self, spec: JobSpec) -> JoinHandle<()> {
        let writer = self.writer.clone();
        let provider = Arc::clone(&self.provider);
        let abort = self.shutdown.child_token();
        tokio::spawn(async move {
            writer.run_prepared(spec, provider, abort).await;
        })
    }

    /// True while the job's producer task is running in this process.
    pub fn is_running(&self, job_id: &JobId) -> bool {
        self.active
            .get(job_id)
            .is_some_and(|slot| !slot.is_finished())
    }

    /// Number of producer tasks still running.
    pub fn running_count(&self) -> usize {
        self.active
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Cancel every running job and wait up to `grace` for them to record
    /// their terminal state. Tasks still running after that are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.cancel();

        let ids: Vec<JobId> = self.active.iter().map(|entry| entry.key().clone()).collect();
        let handles: Vec<JoinHandle<()>> = ids
            .iter()
            .filter_map(|id| match self.active.remove(id) {
                Some((_, Slot::Running(handle))) => Some(handle),
                _ => None,
            })
            .collect();
        if handles.is_empty() {
            return;
        }

        info!(jobs = handles.len(), "waiting for running jobs to stop");
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(grace_ms = grace.as_millis() as u64, "jobs did not stop in time, aborting");
            for handle in aborts {
                handle.abort();
            }
        }
    }
}
