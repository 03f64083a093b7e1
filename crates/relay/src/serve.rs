// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relay serve` implementation.
//!
//! Wires the in-memory event log and job store, the SQLite conversation
//! store, the generation provider, and the producer runner into the gateway,
//! then serves until a shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_config::model::GenerationConfig;
use relay_config::RelayConfig;
use relay_core::{EventLog, GenerationProvider, JobStore, PluginAdapter, RelayError};
use relay_gateway::GatewayState;
use relay_storage::{MemoryEventLog, MemoryJobStore, SqliteConversationStore};
use relay_stream::{EchoProvider, JobRunner, PersistenceHandoff, StreamWriter};

use crate::shutdown;

/// How long running jobs get to record their terminal state on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the `relay serve` command.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.log.level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting relay");

    let log = Arc::new(MemoryEventLog::from_config(&config.event_log));
    let jobs = Arc::new(MemoryJobStore::from_config(&config.jobs));

    let sqlite = SqliteConversationStore::new(config.storage.clone());
    sqlite.initialize().await?;
    let conversations = Arc::new(sqlite);
    info!(path = %config.storage.database_path, "conversation store ready");

    let provider = build_provider(&config.generation);
    let runner = provider.as_ref().map(|provider| {
        let writer = StreamWriter::new(
            log.clone(),
            jobs.clone(),
            PersistenceHandoff::new(conversations.clone()),
            &config.jobs,
        );
        Arc::new(JobRunner::new(writer, provider.clone()))
    });
    if runner.is_none() {
        warn!("no generation provider configured, POST /stream/start is disabled");
    }

    let shutdown = shutdown::install_signal_handler();
    let sweeper = spawn_sweeper(
        log.clone(),
        jobs.clone(),
        config.server.sweep_interval(),
        shutdown.clone(),
    );

    let drain = runner
        .clone()
        .map(|runner| spawn_drain(runner, shutdown.clone(), DRAIN_TIMEOUT));

    let state = GatewayState {
        log,
        jobs,
        conversations: conversations.clone(),
        runner,
        provider,
        subscribe: config.subscribe.clone(),
        default_model: config.generation.default_model.clone(),
        start_time: Instant::now(),
        shutdown: shutdown.clone(),
    };

    let served = relay_gateway::start_server(&config.server, state).await;
    // A bind failure returns before any signal; stop the sweeper either way.
    shutdown.cancel();

    if let Some(drain) = drain
        && let Err(e) = drain.await
    {
        warn!(error = %e, "runner drain ended abnormally");
    }
    if let Err(e) = sweeper.await {
        warn!(error = %e, "sweeper task ended abnormally");
    }
    if let Err(e) = conversations.shutdown().await {
        warn!(error = %e, "conversation store shutdown failed");
    }

    info!("relay stopped");
    served
}

/// Select the generation provider named in `[generation]`.
///
/// `"none"` runs the server in delivery-only mode.
fn build_provider(config: &GenerationConfig) -> Option<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "echo" => Some(Arc::new(EchoProvider::new(Duration::from_millis(
            config.echo_delay_ms,
        )))),
        _ => None,
    }
}

/// Drain running producers as soon as `shutdown` fires, while the server is
/// still closing its connections.
fn spawn_drain(
    runner: Arc<JobRunner>,
    shutdown: CancellationToken,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        shutdown.cancelled().await;
        runner.shutdown(grace).await;
    })
}

/// Periodically drop expired logs, job records, and cancellation flags.
fn spawn_sweeper(
    log: Arc<dyn EventLog>,
    jobs: Arc<dyn JobStore>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let logs = log.purge_expired().await.unwrap_or_else(|e| {
                warn!(error = %e, "event log sweep failed");
                0
            });
            let records = jobs.purge_expired().await.unwrap_or_else(|e| {
                warn!(error = %e, "job store sweep failed");
                0
            });
            if logs + records > 0 {
                debug!(logs, records, "expired state purged");
            }
        }
    })
}

/// Initialize the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{ConversationId, JobId, JobStatus, NewEntry};
    use relay_test_utils::{MockProvider, TestHarness};

    #[test]
    fn provider_selection() {
        let echo = GenerationConfig {
            provider: "echo".into(),
            ..GenerationConfig::default()
        };
        assert_eq!(build_provider(&echo).unwrap().name(), "echo");

        let none = GenerationConfig {
            provider: "none".into(),
            ..GenerationConfig::default()
        };
        assert!(build_provider(&none).is_none());
    }

    #[tokio::test]
    async fn drain_starts_on_signal() {
        let harness = TestHarness::builder()
            .with_provider(MockProvider::new(["a", "b"]).gated())
            .build();
        let job = harness
            .runner
            .start(harness.spec("j1", "c1", "q"))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let drain = spawn_drain(harness.runner.clone(), shutdown.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.runner.is_running(&job));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(3), drain)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(harness.runner.running_count(), 0);
        assert_eq!(
            harness.jobs.get(&job).await.unwrap().unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_expired_state() {
        let log = Arc::new(MemoryEventLog::new(100, Duration::from_secs(5)));
        let jobs = Arc::new(MemoryJobStore::new(
            Duration::from_secs(5),
            Duration::from_secs(5),
        ));
        let job = JobId::from("j1");
        log.append(&job, NewEntry::complete()).await.unwrap();
        jobs.initialize(&job, &ConversationId::from("c1"), "m")
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(
            log.clone(),
            jobs.clone(),
            Duration::from_secs(1),
            shutdown.clone(),
        );
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(log.job_count(), 0);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
