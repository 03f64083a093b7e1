// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Relay integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a generation service or a database.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted generation provider with pacing and failures
//! - [`MockConversationStore`] - In-memory conversation store that records writes
//! - [`TestHarness`] - In-memory stores, a mock provider, and a wired producer

pub mod harness;
pub mod mock_conversations;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_conversations::MockConversationStore;
pub use mock_provider::MockProvider;
