// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hands a finished reply to the durable conversation store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use relay_core::types::{ConversationMessage, GenerationOutcome, Role};
use relay_core::{ConversationId, ConversationStore, JobId, RelayError};

/// Writes the assistant reply produced by a job into its conversation.
///
/// The job id doubles as the assistant message id, so a client that knows the
/// job can find the persisted reply after the live log has expired.
#[derive(Clone)]
pub struct PersistenceHandoff {
    store: Arc<dyn ConversationStore>,
}

impl PersistenceHandoff {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Build the assistant message for a finished or cancelled job.
    pub fn build_message(
        job_id: &JobId,
        model: &str,
        text: String,
        outcome: &GenerationOutcome,
        elapsed: Duration,
        cancelled: bool,
    ) -> ConversationMessage {
        let mut metadata = json!({
            "jobId": job_id,
            "model": model,
            "durationMs": elapsed.as_millis() as u64,
        });
        if cancelled {
            metadata["cancelled"] = json!(true);
        }

        ConversationMessage {
            id: job_id.to_string(),
            role: Role::Assistant,
            content: text,
            sources: outcome.sources.clone(),
            usage: outcome.usage,
            created_at: Utc::now(),
            metadata: Some(metadata),
        }
    }

    /// Replace the conversation's messages with `history` followed by `message`.
    ///
    /// `history` must be the full prior list including the triggering user
    /// message; the store keeps only what is written here.
    pub async fn persist(
        &self,
        conversation_id: &ConversationId,
        history: &[ConversationMessage],
        message: ConversationMessage,
    ) -> Result<(), RelayError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(message);
        self.store.replace_messages(conversation_id, messages).await?;
        debug!(conversation_id = %conversation_id, "assistant reply persisted");
        Ok(())
    }
}
