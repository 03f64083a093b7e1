// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for the Relay streaming layer.
//!
//! - [`MemoryEventLog`] and [`MemoryJobStore`]: per-job keyed state with
//!   bounded retention, shared by producers and subscribers.
//! - [`SqliteConversationStore`]: the durable conversation store, a WAL-mode
//!   SQLite database with embedded migrations and a single-writer
//!   connection via `tokio-rusqlite`.

pub mod conversations;
pub mod database;
pub mod memory;
pub mod migrations;

pub use conversations::SqliteConversationStore;
pub use database::Database;
pub use memory::{MemoryEventLog, MemoryJobStore};
