// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for producer and gateway tests.
//!
//! `TestHarness` assembles in-memory event log and job store, a mock
//! conversation store, a [`MockProvider`], and the [`StreamWriter`] and
//! [`JobRunner`] wired on top of them.

use std::sync::Arc;
use std::time::Duration;

use relay_config::model::RelayConfig;
use relay_core::types::ConversationMessage;
use relay_core::{ConversationId, JobId};
use relay_storage::{MemoryEventLog, MemoryJobStore};
use relay_stream::{JobRunner, JobSpec, PersistenceHandoff, StreamWriter};

use crate::mock_conversations::MockConversationStore;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    provider: Option<MockProvider>,
    config: RelayConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RelayConfig::default();
        // Fast polling keeps paused-clock tests short.
        config.jobs.cancel_poll_interval_ms = 10;
        config.subscribe.poll_interval_ms = 10;
        Self {
            provider: None,
            config,
        }
    }

    /// Use `provider` instead of the default three-fragment script.
    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the event log size cap and retention.
    pub fn with_event_log(mut self, max_entries: usize, ttl: Duration) -> Self {
        self.config.event_log.max_entries = max_entries;
        self.config.event_log.ttl_secs = ttl.as_secs();
        self
    }

    /// Adjust any configuration value before the components are built.
    pub fn with_config(mut self, update: impl FnOnce(&mut RelayConfig)) -> Self {
        update(&mut self.config);
        self
    }

    pub fn build(self) -> TestHarness {
        let config = self.config;
        let log = Arc::new(MemoryEventLog::from_config(&config.event_log));
        let jobs = Arc::new(MemoryJobStore::from_config(&config.jobs));
        let conversations = Arc::new(MockConversationStore::new());
        let provider = Arc::new(
            self.provider
                .unwrap_or_else(|| MockProvider::new(["Hello", ", ", "world"])),
        );

        let writer = StreamWriter::new(
            log.clone(),
            jobs.clone(),
            PersistenceHandoff::new(conversations.clone()),
            &config.jobs,
        );
        let runner = Arc::new(JobRunner::new(writer.clone(), provider.clone()));

        TestHarness {
            log,
            jobs,
            conversations,
            provider,
            writer,
            runner,
            config,
        }
    }
}

/// A producer environment backed entirely by memory.
pub struct TestHarness {
    /// In-memory event log.
    pub log: Arc<MemoryEventLog>,
    /// In-memory job metadata and cancellation flags.
    pub jobs: Arc<MemoryJobStore>,
    /// Conversation store that records handoff writes.
    pub conversations: Arc<MockConversationStore>,
    /// The scripted provider.
    pub provider: Arc<MockProvider>,
    /// Producer wired to the stores above.
    pub writer: StreamWriter,
    /// Background runner using `writer` and `provider`.
    pub runner: Arc<JobRunner>,
    /// Configuration the components were built from.
    pub config: RelayConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings and the default script.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// A job spec whose history is a single user message.
    pub fn spec(&self, job_id: &str, conversation_id: &str, prompt: &str) -> JobSpec {
        JobSpec {
            job_id: JobId::from(job_id),
            conversation_id: ConversationId::from(conversation_id),
            model: self.config.generation.default_model.clone(),
            history: vec![ConversationMessage::user(format!("{job_id}-user"), prompt)],
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
