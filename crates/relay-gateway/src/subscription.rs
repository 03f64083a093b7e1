// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscriber delivery: replay of a job's history and live tailing.
//!
//! Both modes are plain streams of [`SubscriptionEvent`] so they can be tested
//! without HTTP. A subscriber that disconnects simply drops its stream, which
//! stops polling at the next await point. Live streams also end with `Done`
//! when the server's shutdown token fires, so graceful shutdown never waits
//! on a job that is still running.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use relay_config::model::SubscribeConfig;
use relay_core::{EntryId, EventLog, JobId, JobMetadata, JobStore, LogEntry};

/// One event delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    /// Job metadata at the moment a live subscription opened.
    Metadata(JobMetadata),
    /// A log entry, in append order.
    Entry(LogEntry),
    /// The job has ended and no further entries will be sent.
    Done,
    /// Delivery failed; the stream ends after this event.
    Error(String),
}

/// Live polling parameters.
#[derive(Debug, Clone, Copy)]
pub struct DeliverySettings {
    pub poll_interval: Duration,
    pub batch_size: usize,
}

impl From<&SubscribeConfig> for DeliverySettings {
    fn from(config: &SubscribeConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size.max(1),
        }
    }
}

/// Emit every entry after `from` from one read of the full history, stopping
/// at the first terminal entry, then `Done`.
pub fn replay(
    log: Arc<dyn EventLog>,
    job_id: JobId,
    from: EntryId,
) -> impl Stream<Item = SubscriptionEvent> + Send + 'static {
    async_stream::stream! {
        match log.read_all(&job_id).await {
            Ok(entries) => {
                for entry in entries.into_iter().filter(|e| e.id > from) {
                    let terminal = entry.is_terminal();
                    yield SubscriptionEvent::Entry(entry);
                    if terminal {
                        break;
                    }
                }
                yield SubscriptionEvent::Done;
            }
            Err(e) => yield SubscriptionEvent::Error(e.to_string()),
        }
    }
}

/// Emit `metadata`, then tail the log from `from` until the job ends.
///
/// The job ends when a terminal entry is delivered, or when the metadata
/// leaves `streaming` (or expires) and the log has been drained. Cancelling
/// `shutdown` drains the log once more and closes with `Done`.
pub fn live(
    log: Arc<dyn EventLog>,
    jobs: Arc<dyn JobStore>,
    job_id: JobId,
    from: EntryId,
    metadata: JobMetadata,
    settings: DeliverySettings,
    shutdown: CancellationToken,
) -> impl Stream<Item = SubscriptionEvent> + Send + 'static {
    async_stream::stream! {
        yield SubscriptionEvent::Metadata(metadata);

        let mut cursor = from;
        let mut closing = false;
        'poll: loop {
            let batch = match log.read_from(&job_id, &cursor, settings.batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    yield SubscriptionEvent::Error(e.to_string());
                    break;
                }
            };
            let full = batch.len() >= settings.batch_size;
            for entry in batch {
                cursor = entry.id;
                let terminal = entry.is_terminal();
                yield SubscriptionEvent::Entry(entry);
                if terminal {
                    yield SubscriptionEvent::Done;
                    break 'poll;
                }
            }
            if full {
                continue;
            }
            if closing {
                yield SubscriptionEvent::Done;
                break;
            }

            match jobs.get(&job_id).await {
                Ok(Some(meta)) if !meta.status.is_terminal() => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => closing = true,
                        _ = tokio::time::sleep(settings.poll_interval) => {}
                    }
                }
                // Drain once more before closing.
                Ok(_) => closing = true,
                Err(e) => {
                    yield SubscriptionEvent::Error(e.to_string());
                    break;
                }
            }
        }
    }
}
