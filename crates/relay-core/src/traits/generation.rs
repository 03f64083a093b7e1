// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External text-generation service collaborator.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationEvent, GenerationRequest};

/// Stream of fragments ending with an optional `Finished` outcome.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationEvent, RelayError>> + Send>>;

/// Adapter for the remote generation service.
///
/// Providers should stop producing soon after `abort` is cancelled, but callers
/// must not rely on an immediate stop: a few fragments may still arrive.
#[async_trait]
pub trait GenerationProvider: PluginAdapter {
    async fn generate(
        &self,
        request: GenerationRequest,
        abort: CancellationToken,
    ) -> Result<GenerationStream, RelayError>;
}
