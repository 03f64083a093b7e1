// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory conversation store that records every write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use relay_core::types::{AdapterType, Conversation, ConversationMessage, HealthStatus};
use relay_core::{ConversationId, ConversationStore, PluginAdapter, RelayError};

/// A conversation store backed by a `HashMap`.
///
/// Call [`MockConversationStore::set_failing`] to make writes fail, which
/// exercises the producer's best-effort handoff.
#[derive(Default)]
pub struct MockConversationStore {
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MockConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation without counting it as a write.
    pub async fn insert(&self, id: &ConversationId, messages: Vec<ConversationMessage>) {
        self.conversations.lock().await.insert(
            id.clone(),
            Conversation {
                id: id.clone(),
                messages,
                updated_at: Utc::now(),
            },
        );
    }

    /// Stored messages for `id`, empty if the conversation is unknown.
    pub async fn messages(&self, id: &ConversationId) -> Vec<ConversationMessage> {
        self.conversations
            .lock()
            .await
            .get(id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Number of successful `replace_messages` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockConversationStore {
    fn name(&self) -> &str {
        "mock-conversations"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ConversationStore
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ConversationStore for MockConversationStore {
    async fn find_by_id(&self, id: &ConversationId) -> Result<Option<Conversation>, RelayError> {
        Ok(self.conversations.lock().await.get(id).cloned())
    }

    async fn replace_messages(
        &self,
        id: &ConversationId,
        messages: Vec<ConversationMessage>,
    ) -> Result<(), RelayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::storage("mock conversation store is failing"));
        }
        self.insert(id, messages).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
