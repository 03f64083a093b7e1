// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the event log, job store, producer, and gateway.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RelayError;

/// Unique identifier for one generation job.
///
/// Distinct from the conversation id so that several jobs may run against
/// the same conversation at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random job id.
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Unique identifier for a conversation document in the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        ConversationId(s.to_string())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    EventLog,
    JobStore,
    ConversationStore,
    Generation,
}

/// Lifecycle status of a job.
///
/// `Streaming` is the only non-terminal state; every other state is final.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Streaming,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Streaming)
    }
}

/// Kind of a log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    Chunk,
    Metadata,
    Sources,
    Complete,
    Error,
}

impl EntryKind {
    /// Complete and error entries end a job's log.
    pub fn is_terminal(self) -> bool {
        matches!(self, EntryKind::Complete | EntryKind::Error)
    }
}

/// Log-assigned cursor: `<millis>-<seq>`.
///
/// Ordering is lexicographic on `(millis, seq)`, so ids compare in append
/// order within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId {
    pub millis: u64,
    pub seq: u64,
}

impl EntryId {
    /// The cursor that precedes every entry.
    pub const ZERO: EntryId = EntryId { millis: 0, seq: 0 };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    /// The smallest id strictly greater than `self` for a clock reading of `now_millis`.
    pub fn successor(self, now_millis: u64) -> Self {
        if now_millis > self.millis {
            EntryId::new(now_millis, 0)
        } else {
            EntryId::new(self.millis, self.seq + 1)
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || RelayError::InvalidCursor(s.to_string());
        match s.split_once('-') {
            None => {
                let millis = s.parse::<u64>().map_err(|_| invalid())?;
                Ok(EntryId::new(millis, 0))
            }
            Some((millis, seq)) => {
                let millis = millis.parse::<u64>().map_err(|_| invalid())?;
                let seq = seq.parse::<u64>().map_err(|_| invalid())?;
                Ok(EntryId::new(millis, seq))
            }
        }
    }
}

impl TryFrom<String> for EntryId {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

/// A citation attached to a generated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Token accounting reported by the generation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// An entry payload before the log assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub data: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub sources: Option<Vec<Source>>,
    pub error: Option<String>,
}

impl NewEntry {
    fn bare(kind: EntryKind) -> Self {
        Self {
            kind,
            data: None,
            metadata: None,
            sources: None,
            error: None,
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            data: Some(text.into()),
            ..Self::bare(EntryKind::Chunk)
        }
    }

    pub fn metadata(value: serde_json::Value) -> Self {
        Self {
            metadata: Some(value),
            ..Self::bare(EntryKind::Metadata)
        }
    }

    pub fn sources(sources: Vec<Source>) -> Self {
        Self {
            sources: Some(sources),
            ..Self::bare(EntryKind::Sources)
        }
    }

    pub fn complete() -> Self {
        Self::bare(EntryKind::Complete)
    }

    /// A complete entry carrying extra metadata (e.g. `{"cancelled": true}`).
    pub fn complete_with(metadata: serde_json::Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::bare(EntryKind::Complete)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::bare(EntryKind::Error)
        }
    }

    /// Stamp the payload with its log id and timestamp.
    pub fn into_entry(self, id: EntryId, timestamp: i64) -> LogEntry {
        LogEntry {
            id,
            kind: self.kind,
            timestamp,
            data: self.data,
            metadata: self.metadata,
            sources: self.sources,
            error: self.error,
        }
    }
}

/// One record in a job's append-only event log.
///
/// Wire shape: `{ id, type, timestamp, data?, metadata?, sources?, error? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Epoch milliseconds at append time.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

/// Per-job status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    pub job_id: JobId,
    pub conversation_id: ConversationId,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub model: String,
    pub chunk_count: u64,
}

impl JobMetadata {
    /// A freshly started job.
    pub fn streaming(job_id: JobId, conversation_id: ConversationId, model: &str) -> Self {
        Self {
            job_id,
            conversation_id,
            status: JobStatus::Streaming,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            model: model.to_string(),
            chunk_count: 0,
        }
    }
}

/// Role of a stored conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation as held by the durable store.
///
/// Only the fields streaming needs are modelled; `metadata` carries the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ConversationMessage {
    /// A plain user message created now.
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            usage: None,
            created_at: Utc::now(),
            metadata: None,
        }
    }
}

/// A conversation document: id plus its full message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<ConversationMessage>,
    pub updated_at: DateTime<Utc>,
}

/// A request handed to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub conversation_id: ConversationId,
    pub model: String,
    pub messages: Vec<ConversationMessage>,
}

/// Final result of a generation call, available after the last fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutcome {
    pub usage: Option<TokenUsage>,
    pub sources: Vec<Source>,
}

/// One item of the generation service's output stream.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// An incremental text fragment.
    Fragment(String),
    /// The awaited final result. Always the last item when present.
    Finished(GenerationOutcome),
}
