// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable conversation store collaborator.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, ConversationId, ConversationMessage};

/// Long-term document store keyed by conversation id.
///
/// Streaming depends on exactly these two operations.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    async fn find_by_id(&self, id: &ConversationId) -> Result<Option<Conversation>, RelayError>;

    /// Replaces the full stored message list (last writer wins).
    ///
    /// Callers must pass the complete combined array, never a delta.
    async fn replace_messages(
        &self,
        id: &ConversationId,
        messages: Vec<ConversationMessage>,
    ) -> Result<(), RelayError>;
}
