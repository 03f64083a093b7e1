// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and Server-Sent Events gateway for the Relay streaming layer.
//!
//! Exposes job status, cancellation, subscription (live or replay), and job
//! start over axum. Subscriptions are framed as SSE with `metadata`, `entry`,
//! `done`, and `error` events.

pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;
pub mod subscription;

pub use error::ApiError;
pub use server::{router, start_server, GatewayState};
pub use subscription::{DeliverySettings, SubscriptionEvent};
