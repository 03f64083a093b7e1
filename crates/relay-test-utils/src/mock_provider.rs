// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation provider for deterministic testing.
//!
//! `MockProvider` replays a fixed list of fragments on every call. Fragments
//! can be paced by a delay (use a paused tokio clock) or by a gate that the
//! test releases one permit at a time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use relay_core::types::{
    AdapterType, GenerationEvent, GenerationOutcome, GenerationRequest, HealthStatus, Source,
    TokenUsage,
};
use relay_core::{GenerationProvider, GenerationStream, PluginAdapter, RelayError};

/// A scripted generation provider.
pub struct MockProvider {
    fragments: Vec<String>,
    delay: Duration,
    outcome: GenerationOutcome,
    fail_at: Option<(usize, String)>,
    start_failure: Option<String>,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockProvider {
    /// A provider that yields `fragments` and then finishes with default usage.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
            outcome: GenerationOutcome {
                usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 20,
                }),
                sources: Vec::new(),
            },
            fail_at: None,
            start_failure: None,
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wait `delay` before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Attach sources to the final outcome.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.outcome.sources = sources;
        self
    }

    /// Fail with `message` instead of yielding fragment `index`. An index equal
    /// to the fragment count fails after the last fragment.
    pub fn failing_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.fail_at = Some((index, message.into()));
        self
    }

    /// Fail the `generate` call itself, before any stream exists.
    pub fn failing_to_start(mut self, message: impl Into<String>) -> Self {
        self.start_failure = Some(message.into());
        self
    }

    /// Hold each fragment until [`MockProvider::release`] grants a permit.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` more gated fragments through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// The concatenation of every scripted fragment.
    pub fn full_text(&self) -> String {
        self.fragments.concat()
    }
}

async fn pace(delay: Duration, gate: Option<&Semaphore>) {
    if let Some(gate) = gate
        && let Ok(permit) = gate.acquire().await
    {
        permit.forget();
    }
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
        abort: CancellationToken,
    ) -> Result<GenerationStream, RelayError> {
        self.requests.lock().await.push(request);
        if let Some(message) = &self.start_failure {
            return Err(RelayError::generation(message.clone()));
        }

        let fragments = self.fragments.clone();
        let total = fragments.len();
        let delay = self.delay;
        let outcome = self.outcome.clone();
        let fail_at = self.fail_at.clone();
        let gate = self.gate.clone();

        let stream = async_stream::stream! {
            let mut failed = fail_at.as_ref().is_some_and(|(at, _)| *at == total);
            for (index, fragment) in fragments.into_iter().enumerate() {
                if fail_at.as_ref().is_some_and(|(at, _)| *at == index) {
                    failed = true;
                    break;
                }
                tokio::select! {
                    biased;
                    _ = abort.cancelled() => {}
                    _ = pace(delay, gate.as_deref()) => {}
                }
                if abort.is_cancelled() {
                    break;
                }
                yield Ok(GenerationEvent::Fragment(fragment));
            }

            if abort.is_cancelled() {
                yield Err(RelayError::Cancelled);
            } else if failed {
                let message = fail_at.map(|(_, m)| m).unwrap_or_default();
                yield Err(RelayError::generation(message));
            } else {
                yield Ok(GenerationEvent::Finished(outcome));
            }
        };
        Ok(Box::pin(stream))
    }
}
