// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A development provider that streams the user's last message back.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use relay_core::types::{
    AdapterType, GenerationEvent, GenerationOutcome, GenerationRequest, HealthStatus, Role,
    TokenUsage,
};
use relay_core::{GenerationProvider, GenerationStream, PluginAdapter, RelayError};

/// Echoes the most recent user message one word at a time.
///
/// Stands in for a real generation service so the server can be exercised
/// end to end without network access.
pub struct EchoProvider {
    delay: Duration,
}

impl EchoProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

/// Split `text` into words, keeping each word's trailing whitespace.
fn words(text: &str) -> Vec<String> {
    text.split_inclusive(char::is_whitespace)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl PluginAdapter for EchoProvider {
    fn name(&self) -> &str {
        "echo"
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
impl GenerationProvider for EchoProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
        abort: CancellationToken,
    ) -> Result<GenerationStream, RelayError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .ok_or_else(|| RelayError::generation("no user message to echo"))?;

        let fragments = words(&prompt);
        let input_tokens = fragments.len() as u32;
        let delay = self.delay;

        let stream = async_stream::stream! {
            let mut produced = 0u32;
            for fragment in fragments {
                if !delay.is_zero() {
                    tokio::select! {
                        _ = abort.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                if abort.is_cancelled() {
                    break;
                }
                produced += 1;
                yield Ok(GenerationEvent::Fragment(fragment));
            }

            if abort.is_cancelled() {
                yield Err(RelayError::Cancelled);
            } else {
                yield Ok(GenerationEvent::Finished(GenerationOutcome {
                    usage: Some(TokenUsage {
                        input_tokens,
                        output_tokens: produced,
                    }),
                    sources: Vec::new(),
                }));
            }
        };
        Ok(Box::pin(stream))
    }
}
