// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Relay streaming layer.
//!
//! This crate provides the data model of a generation job (metadata, log
//! entries, cursors), the shared error type, and the adapter traits that the
//! storage backends, the producer, and the gateway are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RelayError;
pub use types::{
    AdapterType, ConversationId, EntryId, EntryKind, HealthStatus, JobId, JobMetadata, JobStatus,
    LogEntry, NewEntry,
};

pub use traits::{
    ConversationStore, EventLog, GenerationProvider, GenerationStream, JobStore, PluginAdapter,
};
