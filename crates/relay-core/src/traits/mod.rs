// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod conversation;
pub mod event_log;
pub mod generation;
pub mod job_store;

pub use adapter::PluginAdapter;
pub use conversation::ConversationStore;
pub use event_log::EventLog;
pub use generation::{GenerationProvider, GenerationStream};
pub use job_store::JobStore;
